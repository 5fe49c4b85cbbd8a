//! # Events Module
//!
//! Event-driven architecture for GUI-ready progress reporting.
//!
//! ## Design
//! The core library emits events through channels, allowing any UI
//! (CLI, GUI, web) to subscribe and display progress and results.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! // In a separate thread, listen for events
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         match event {
//!             Event::Batch(BatchEvent::Progress(p)) => println!("{:.0}%", p.fraction * 100.0),
//!             Event::Results(ResultsEvent::Flushed { rows }) => println!("+{} rows", rows.len()),
//!             _ => {}
//!         }
//!     }
//! });
//!
//! let mut session = Session::builder().engine(factory).events(sender).build()?;
//! session.process_batch(files)?;
//! ```

mod channel;
mod types;

pub use channel::{EventChannel, EventReceiver, EventSender, null_sender};
pub use types::*;
