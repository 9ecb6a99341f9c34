use crate::clipboard::Clipboard;
use crate::commands::{self, Action};
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::hooks::QueryContext;
use crate::qr::Sharer;
use crate::routes::Route;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult, Toast, Toasts};
use crate::ui::view::{View, ViewAction};
use crate::ui::{self, views};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info};

const TOAST_TTL: Duration = Duration::from_secs(3);

/// Handles shared by every view: the query context, config, and a way back
/// into the event loop.
#[derive(Clone)]
pub struct Services {
  pub ctx: QueryContext,
  pub config: Arc<Config>,
  pub events: mpsc::UnboundedSender<Event>,
  pub clipboard: Arc<Mutex<Box<dyn Clipboard>>>,
  pub sharer: Option<Arc<dyn Sharer>>,
}

impl Services {
  pub fn token(&self) -> String {
    self.ctx.auth.token()
  }

  pub fn notify(&self, toast: Toast) {
    let _ = self.events.send(Event::Notify(toast));
  }

  pub fn navigate(&self, route: Route) {
    let _ = self.events.send(Event::Navigate(route));
  }
}

struct Screen {
  route: Route,
  view: Box<dyn View>,
}

/// Main application state
pub struct App {
  services: Services,

  /// Navigation stack - root is always at index 0
  stack: Vec<Screen>,

  /// `:` prompt for commands and paths
  command: CommandInput,

  toasts: Toasts,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(services: Services, initial: Route) -> Self {
    let mut app = Self {
      services,
      stack: Vec::new(),
      command: CommandInput::new(),
      toasts: Toasts::new(TOAST_TTL),
      should_quit: false,
    };
    app.reset(initial);
    app
  }

  pub async fn run(&mut self, mut events: EventHandler) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.event_loop(&mut terminal, &mut events).await;

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop<B: Backend>(
    &mut self,
    terminal: &mut Terminal<B>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      if let Some(event) = events.next().await {
        self.handle_event(event);
      }
    }
    Ok(())
  }

  pub fn should_quit(&self) -> bool {
    self.should_quit
  }

  pub fn services(&self) -> &Services {
    &self.services
  }

  pub fn current_route(&self) -> Option<&Route> {
    self.stack.last().map(|s| &s.route)
  }

  pub(crate) fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.stack.last_mut().map(|s| &mut s.view)
  }

  pub fn hides_chrome(&self) -> bool {
    self.current_route().is_some_and(Route::hides_chrome)
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self.stack.iter().map(|s| s.view.breadcrumb_label()).collect()
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command
  }

  pub fn toasts(&self) -> &Toasts {
    &self.toasts
  }

  fn open(&self, route: Route) -> Screen {
    let route = route.guard(self.services.ctx.auth.is_logged_in());
    let view = views::build(&route, &self.services);
    Screen { route, view }
  }

  /// Push a route unless it is already on top
  fn push(&mut self, route: Route) {
    let screen = self.open(route);
    if self.current_route() == Some(&screen.route) {
      return;
    }
    debug!(route = %screen.route, "push");
    self.stack.push(screen);
  }

  fn replace(&mut self, route: Route) {
    let screen = self.open(route);
    debug!(route = %screen.route, "replace");
    self.stack.pop();
    self.stack.push(screen);
  }

  /// Make `route` the only entry on the stack
  fn reset(&mut self, route: Route) {
    let screen = self.open(route);
    debug!(route = %screen.route, "reset");
    self.stack.clear();
    self.stack.push(screen);
  }

  fn pop(&mut self) {
    if self.stack.len() > 1 {
      self.stack.pop();
    } else {
      self.should_quit = true;
    }
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(route) => self.push(route),
      ViewAction::Replace(route) => self.replace(route),
      ViewAction::Pop => self.pop(),
    }
  }

  pub fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.tick(Instant::now()),
      Event::Navigate(route) => self.push(route),
      Event::Notify(toast) => self.toasts.push(toast, Instant::now()),
    }
  }

  fn tick(&mut self, now: Instant) {
    self.toasts.tick(now);
    let action = match self.current_view_mut() {
      Some(view) => view.tick(),
      None => ViewAction::None,
    };
    self.apply(action);
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let editing = self
      .stack
      .last()
      .is_some_and(|screen| screen.view.is_editing());
    if self.command.is_active() || !editing {
      self.command.set_logged_in(self.services.ctx.auth.is_logged_in());
      match self.command.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(cmd)) => {
          self.execute_command(&cmd);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let action = match self.current_view_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::None,
    };
    self.apply(action);
  }

  fn execute_command(&mut self, cmd: &str) {
    match commands::resolve(cmd) {
      Action::Navigate(route) => self.reset(route),
      Action::Logout => {
        self.services.ctx.logout();
        info!("logged out");
        self.reset(Route::Landing);
        self.toasts.push(Toast::info("Logged out"), Instant::now());
      }
      Action::Quit => self.should_quit = true,
      Action::Unknown(name) => {
        self
          .toasts
          .push(Toast::error(format!("Unknown command: {}", name)), Instant::now());
      }
    }
  }
}
