pub mod op_code;
pub mod payload;
pub mod unit;
