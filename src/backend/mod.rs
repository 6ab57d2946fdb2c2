//! 编译器后端：展平体系结构并链接组件协议

pub mod flatten;
pub mod linker;
