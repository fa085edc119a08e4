// ==========================================
// 轮值工作流引擎 - 命令行入口
// ==========================================
// 用于定时任务 (cron) 与运维操作:
//   shift-workflow init-db
//   shift-workflow tick --date 2026-05-01
//   shift-workflow remind
//   shift-workflow exclude --shift <id> --apply
//   shift-workflow config set exclusion_task_amount 3
// ==========================================

use std::sync::Arc;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde::Serialize;

use shift_workflow::app::{get_default_db_path, AppState, DB_PATH_ENV};
use shift_workflow::config::WorkflowConfigReader;
use shift_workflow::engine::TracingNotificationGateway;
use shift_workflow::{i18n, logging};

#[derive(Debug, Parser)]
#[command(name = "shift-workflow", version, about = "志愿者轮值工作流引擎")]
struct Cli {
    /// SQLite 数据库文件路径
    #[arg(long, global = true, env = DB_PATH_ENV)]
    db: Option<String>,

    /// 默认日志级别 (RUST_LOG 优先)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 初始化数据库 schema
    InitDb,
    /// 执行每日处理 (逾期跳过/到期迁移/任务派发/淘汰评估)
    Tick {
        /// 业务日期, 默认今天
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// 向当日报告未提交的成员发送提醒
    Remind {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// 评估 (并可执行) 成员淘汰
    Exclude {
        /// 轮值ID
        #[arg(long)]
        shift: String,
        #[arg(long)]
        date: Option<NaiveDate>,
        /// 执行淘汰, 否则仅列出候选
        #[arg(long)]
        apply: bool,
    },
    /// 配置管理
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// 显示生效配置
    Show,
    /// 设置配置项
    Set { key: String, value: String },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn today_or(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Local::now().date_naive())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_with_level(&cli.log_level);

    let db_path = cli.db.clone().unwrap_or_else(get_default_db_path);
    tracing::info!(version = shift_workflow::VERSION, db_path = %db_path, "启动");

    let state = AppState::open(&db_path, Arc::new(TracingNotificationGateway))
        .with_context(|| format!("无法打开数据库: {}", db_path))?;

    let locale = state.config.get_locale().await?;
    i18n::set_locale(&locale);

    match cli.command {
        Command::InitDb => {
            let version = state.db.schema_version().await?;
            println!("schema_version = {}", version.unwrap_or_default());
        }
        Command::Tick { date } => {
            let report = state.shift_api.run_daily_tick(today_or(date)).await?;
            for failure in &report.failures {
                tracing::warn!(shift_id = %failure.shift_id, error = %failure.error, "轮值每日处理失败");
            }
            print_json(&report)?;
        }
        Command::Remind { date } => {
            let sent = state.shift_api.send_reminders(today_or(date)).await?;
            println!("reminders sent: {}", sent);
        }
        Command::Exclude { shift, date, apply } => {
            let candidates = state
                .shift_api
                .get_exclusion_candidates(&shift, today_or(date))
                .await?;
            if apply && !candidates.is_empty() {
                let ids: Vec<String> = candidates.iter().map(|m| m.member_id.to_string()).collect();
                let outcome = state.shift_api.exclude_members(&shift, &ids).await?;
                print_json(&outcome)?;
            } else {
                print_json(&candidates)?;
            }
        }
        Command::Config { action } => match action {
            ConfigAction::Show => print_json(&state.config_api.effective_settings().await?)?,
            ConfigAction::Set { key, value } => {
                state.config_api.update_config(&key, &value).await?;
                println!("{} = {}", key, value);
            }
        },
    }

    Ok(())
}
