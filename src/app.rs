use crate::api::{ApiClient, CachedApiClient};
use crate::cache::{CacheLayer, CacheStorage, NoopStorage, SqliteStorage};
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::net::NetworkMonitor;
use crate::session::SessionStore;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::renderfns::draw_header;
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{LoginView, ProjectFormView, ProjectListView};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Main application: terminal lifecycle, the view stack, and the app-level
/// command palette. Everything else is delegated to the current view.
pub struct App {
  config: Config,
  api: CachedApiClient,
  session: Arc<SessionStore>,
  view_stack: Vec<Box<dyn View>>,
  command: CommandInput,
  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let session = Arc::new(SessionStore::open()?);

    let monitor = NetworkMonitor::spawn(
      url::Url::parse(&config.api.url)
        .map_err(|e| eyre!("Invalid API URL {}: {}", config.api.url, e))?,
      Duration::from_secs(config.api.probe_interval_secs),
    );

    let storage: Arc<dyn CacheStorage> = if config.cache.enabled {
      Arc::new(SqliteStorage::open()?)
    } else {
      Arc::new(NoopStorage)
    };
    let cache = CacheLayer::new(storage, monitor.flag());

    let client = ApiClient::new(&config, session.clone(), monitor.flag())?;
    let api = CachedApiClient::new(client, cache);

    // Resume the saved session if there is one
    let root: Box<dyn View> = if session.is_authenticated() {
      info!(email = session.email().as_deref().unwrap_or(""), "resuming saved session");
      Box::new(ProjectListView::new(api.clone()))
    } else {
      Box::new(LoginView::new(api.clone()))
    };

    Ok(Self {
      config,
      api,
      session,
      view_stack: vec![root],
      command: CommandInput::new(),
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));

    let result = self.event_loop(&mut terminal, &mut events).await;

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(
    &mut self,
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => {
          if let Some(view) = self.view_stack.last_mut() {
            let action = view.tick();
            self.apply_action(action);
          }
        }
        Some(Event::Resize) => {}
        None => break,
      }
    }
    Ok(())
  }

  fn draw(&mut self, frame: &mut Frame) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Header
        Constraint::Min(1),    // Current view
        Constraint::Length(1), // Status bar
      ])
      .split(frame.area());

    let email = self.session.email();
    // An explicit title wins over the API domain
    let label = self.config.title.as_deref().unwrap_or(&self.config.api.url);
    draw_header(frame, chunks[0], label, email.as_deref(), self.api.is_online());

    if let Some(view) = self.view_stack.last_mut() {
      view.render(frame, chunks[1]);
    }

    let hint = self
      .view_stack
      .last()
      .map(|v| v.status_hint())
      .unwrap_or("");
    let status = Paragraph::new(hint).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(status, chunks[2]);

    // Command palette draws over everything
    self.command.render_overlay(frame, chunks[1]);
  }

  fn handle_key(&mut self, key: crossterm::event::KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    // The palette only activates on ':' when signed in, so typing into the
    // auth forms is never intercepted
    if self.session.is_authenticated() || self.command.is_active() {
      match self.command.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(cmd)) => {
          self.execute_command(&cmd);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    if let Some(view) = self.view_stack.last_mut() {
      let action = view.handle_key(key);
      self.apply_action(action);
    }
  }

  fn execute_command(&mut self, cmd: &str) {
    match cmd {
      "projects" => {
        self.view_stack = vec![Box::new(ProjectListView::new(self.api.clone()))];
      }
      "new" => {
        self
          .view_stack
          .push(Box::new(ProjectFormView::create(self.api.clone())));
      }
      "refresh" => {
        self.api.refresh_projects();
        if let Some(view) = self.view_stack.last_mut() {
          view.on_resume();
        }
      }
      "logout" => self.logout(),
      "quit" => self.should_quit = true,
      _ => {}
    }
  }

  fn logout(&mut self) {
    info!("logging out");
    self.session.clear();
    self.api.refresh_projects();
    self.view_stack = vec![Box::new(LoginView::with_notice(
      self.api.clone(),
      "Signed out".to_string(),
    ))];
  }

  fn apply_action(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
          if let Some(view) = self.view_stack.last_mut() {
            view.on_resume();
          }
        } else {
          self.should_quit = true;
        }
      }
      ViewAction::Replace(view) => {
        self.view_stack.pop();
        self.view_stack.push(view);
      }
      ViewAction::ResetTo(view) => {
        self.view_stack = vec![view];
      }
      ViewAction::Quit => self.should_quit = true,
    }
  }
}
