// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use shift_workflow::api::NewUser;
use shift_workflow::domain::report::Report;
use shift_workflow::domain::shift::NewShift;
use shift_workflow::domain::types::ReportStatus;
use shift_workflow::domain::user::User;
use uuid::Uuid;

/// 测试基准月份中的某一天 (2026-05-dd)
pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
}

pub fn noon(d: u32) -> NaiveDateTime {
    day(d).and_hms_opt(12, 0, 0).unwrap()
}

// ==========================================
// User 构建器
// ==========================================

pub struct UserBuilder {
    seq: i64,
    name: String,
    surname: String,
    city: String,
}

impl UserBuilder {
    pub fn new(seq: i64) -> Self {
        Self {
            seq,
            name: format!("Иван{}", seq),
            surname: format!("Петров{}", seq),
            city: "Москва".to_string(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn surname(mut self, surname: &str) -> Self {
        self.surname = surname.to_string();
        self
    }

    pub fn build(self) -> User {
        User {
            id: Uuid::new_v4(),
            name: self.name,
            surname: self.surname,
            date_of_birth: NaiveDate::from_ymd_opt(1995, 1, 1).unwrap(),
            city: self.city,
            phone_number: format!("+7900000{:04}", self.seq),
            telegram_id: 100_000 + self.seq,
            created_at: noon(1),
        }
    }

    pub fn build_new(self) -> NewUser {
        let user = self.build();
        NewUser {
            name: user.name,
            surname: user.surname,
            date_of_birth: user.date_of_birth,
            city: user.city,
            phone_number: user.phone_number,
            telegram_id: user.telegram_id,
        }
    }
}

// ==========================================
// Shift 构建器
// ==========================================

pub struct ShiftBuilder {
    title: String,
    started_at: NaiveDate,
    finished_at: NaiveDate,
    final_message: String,
}

impl ShiftBuilder {
    pub fn new(started_at: NaiveDate, finished_at: NaiveDate) -> Self {
        Self {
            title: "Весенняя смена".to_string(),
            started_at,
            finished_at,
            final_message: "Спасибо за участие!".to_string(),
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn final_message(mut self, message: &str) -> Self {
        self.final_message = message.to_string();
        self
    }

    pub fn build(self) -> NewShift {
        NewShift {
            title: self.title,
            started_at: self.started_at,
            finished_at: self.finished_at,
            final_message: self.final_message,
        }
    }
}

// ==========================================
// Report 构建器
// ==========================================

pub struct ReportBuilder {
    report: Report,
}

impl ReportBuilder {
    pub fn new(shift_id: Uuid, member_id: Uuid, task_id: Uuid, task_date: NaiveDate) -> Self {
        Self {
            report: Report::waiting(shift_id, member_id, task_id, task_date, noon(1)),
        }
    }

    pub fn status(mut self, status: ReportStatus) -> Self {
        self.report.status = status;
        if status != ReportStatus::Waiting && status != ReportStatus::Skipped {
            self.report.photo_url = Some("https://photos/proof.jpg".to_string());
            self.report.uploaded_at = Some(noon(1));
        }
        self
    }

    pub fn build(self) -> Report {
        self.report
    }
}
