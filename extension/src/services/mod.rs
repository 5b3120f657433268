// Bindings from the bridge traits to chrome.* and window APIs

pub mod js;
pub mod runtime;
pub mod storage;
pub mod tabs;
pub mod window;

pub use runtime::{ChromeRuntimeBus, ChromeRuntimeSender};
pub use storage::{ChromeStorage, KeyValueStore};
pub use tabs::ChromeTabs;
pub use window::BrowserWindow;
