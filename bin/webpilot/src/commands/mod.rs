pub mod doctor;
pub mod plugins_cmd;
pub mod run_cmd;
pub mod serve;
pub mod tools_cmd;
