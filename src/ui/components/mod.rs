mod command_input;
mod form;
mod input;
mod key_result;
mod picker;
mod search_input;

pub use command_input::{CommandEvent, CommandInput};
pub use form::{Form, FormEvent};
pub use key_result::KeyResult;
pub use picker::{Picker, PickerEvent};
pub use search_input::{SearchEvent, SearchInput};
