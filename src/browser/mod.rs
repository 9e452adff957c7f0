//! 无头浏览器 - 基础设施层

pub mod headless;

pub use headless::launch_headless_browser;
