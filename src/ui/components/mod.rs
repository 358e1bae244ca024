mod command_overlay;
mod form;
mod input;

pub use command_overlay::draw_command_overlay;
pub use form::{Field, FieldKind, Form, FormResult};
pub use input::{InputResult, TextInput};
