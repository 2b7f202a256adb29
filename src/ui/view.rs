use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// Actions a view can request in response to user input or a completed
/// async operation.
pub enum ViewAction {
  /// No action needed
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
  /// Replace the current view in place (flow steps like register -> verify)
  Replace(Box<dyn View>),
  /// Clear the stack and install a new root (login/logout transitions)
  ResetTo(Box<dyn View>),
  /// Exit the application
  Quit,
}

/// Trait for view behavior.
///
/// Views handle their own input modes (search, forms, overlays) and return
/// actions for the App to execute: App -> View -> Components.
///
/// Views that load data asynchronously hold a Query<T> and poll it from
/// `tick()`, returning an action when a result warrants a transition.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// Called on each tick so views can poll async queries
  fn tick(&mut self) -> ViewAction {
    ViewAction::None
  }

  /// Called when the view above this one is popped
  fn on_resume(&mut self) {}

  /// Hint line for the status bar
  fn status_hint(&self) -> &'static str {
    " :command  q:back  Ctrl-C:quit"
  }
}
