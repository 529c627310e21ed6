//! 浏览器会话管理
//!
//! 两种接入方式：
//! - `connection` - 连接到操作员已手动登录的调试端口浏览器（交互式运行）
//! - `headless` - 启动无头浏览器（完全无人值守运行，需要免登录环境）

pub mod connection;
pub mod headless;

pub use connection::connect_to_browser_and_page;
pub use headless::launch_headless_browser;
