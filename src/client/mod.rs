//! Browser-side behaviour of the tray, as a library: fetch the fragment once,
//! show it, then dismiss each notification on click or after its fadeout and
//! acknowledge it.

pub mod runtime;
pub mod surface;
pub mod transport;

pub use runtime::{ClickHandle, DismissOutcome, TrayRuntime};
pub use surface::{Surface, TerminalSurface};
pub use transport::{HttpTransport, TrayTransport};
