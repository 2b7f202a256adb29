pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use ratatui::widgets::ListState;

/// Clamp a list selection to the current item count. Selects the first item
/// when nothing is selected and items exist, clears the selection when the
/// list is empty.
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }
  match state.selected() {
    None => state.select(Some(0)),
    Some(i) if i >= len => state.select(Some(len - 1)),
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_list_clears_selection() {
    let mut state = ListState::default();
    state.select(Some(3));
    ensure_valid_selection(&mut state, 0);
    assert_eq!(state.selected(), None);
  }

  #[test]
  fn test_selects_first_when_unset() {
    let mut state = ListState::default();
    ensure_valid_selection(&mut state, 5);
    assert_eq!(state.selected(), Some(0));
  }

  #[test]
  fn test_clamps_out_of_range() {
    let mut state = ListState::default();
    state.select(Some(9));
    ensure_valid_selection(&mut state, 4);
    assert_eq!(state.selected(), Some(3));
  }

  #[test]
  fn test_valid_selection_untouched() {
    let mut state = ListState::default();
    state.select(Some(2));
    ensure_valid_selection(&mut state, 4);
    assert_eq!(state.selected(), Some(2));
  }
}
