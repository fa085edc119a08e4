// ==========================================
// 集成测试公共模块
// ==========================================

#![allow(dead_code)]

pub mod mock_gateway;
pub mod test_data_builder;
pub mod workflow_test_env;
