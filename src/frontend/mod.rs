//! 编译器前端：词法分析、包含指令与声明解析

pub mod include;
pub mod parser;
pub mod state;
pub mod tokenizer;
