#![forbid(unsafe_code)]

//! Message list widgets for msgview.
//!
//! - [`progressive`] - A list that materializes a prefix of its items and
//!   grows it as the reader scrolls or navigates with the keyboard.

pub mod progressive;

pub use progressive::{
    AttachError, AttachHandle, ItemRenderer, ListConfig, ListEvent, ListItem, NavCommand,
    ProgressiveList,
};
