/// How a component answered a key event.
///
/// Every interactive component reports back through this enum so views can
/// chain components and stop at the first one that consumes the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Key was consumed, nothing for the parent to do
  Handled,
  /// Key was consumed and produced an event the parent must act on
  Event(T),
  /// Key was not consumed, parent should try the next handler
  NotHandled,
}
