// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 创建临时数据库文件并初始化 schema
// ==========================================

use shift_workflow::db::Database;
use std::error::Error;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - Database: 已初始化的数据库句柄
pub fn create_test_db() -> Result<(NamedTempFile, Database), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db = Database::open(temp_file.path())?;
    Ok((temp_file, db))
}
