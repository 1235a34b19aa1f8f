pub mod controls;
pub mod filter;
pub mod popup;
pub mod toast;

pub use controls::{
    Control, ControlManager, LayersControl, LocateAction, LocateControl, Position, ScaleControl,
};

pub use filter::{FilterBar, TagAttribute, TagFilterButton};

pub use popup::{Lightbox, Popup, PopupManager};

pub use toast::{copy_to_clipboard, Clipboard, MemoryClipboard, Toast, ToastArea};
