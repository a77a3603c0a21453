use crate::domain::catalog;
use crate::domain::models::{
    device_display_name, AppEvent, ConnectionState, ConnectionStatus, GridValue, MessageSeverity,
    StatusMessage,
};
use crate::infrastructure::advisory::AdvisoryService;
use crate::infrastructure::bluetooth::BluetoothService;
use crate::infrastructure::haptics::{Haptics, PRESS_PULSE};
use crate::presentation::console::{self, ConsoleInput};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// What the panel does with one line of input
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelCommand {
    Connect,
    Disconnect,
    Status,
    Grid,
    Quit,
    Press(&'static GridValue),
    Unknown,
}

pub fn parse_command(line: &str) -> PanelCommand {
    match line.trim().to_lowercase().as_str() {
        "connect" | "c" => PanelCommand::Connect,
        "disconnect" | "d" => PanelCommand::Disconnect,
        "status" | "s" => PanelCommand::Status,
        "grid" | "g" | "help" | "?" => PanelCommand::Grid,
        "quit" | "q" | "exit" => PanelCommand::Quit,
        other => catalog::find(other).map_or(PanelCommand::Unknown, PanelCommand::Press),
    }
}

/// Header line: title, status indicator and the device name
pub fn format_header(state: &ConnectionState, device_name: Option<&str>) -> String {
    let indicator = match state.status {
        ConnectionStatus::Connected => "●",
        ConnectionStatus::Connecting => "◌",
        ConnectionStatus::Error => "✖",
        ConnectionStatus::Disconnected => "○",
    };
    let mut header = format!(
        "CONTROLLER {} {} [{}]",
        indicator,
        state.status,
        device_display_name(device_name)
    );
    if let Some(message) = &state.error_message {
        header.push_str(" - ");
        header.push_str(message);
    }
    header
}

pub fn format_grid(last_sent: Option<&str>) -> String {
    catalog::rows()
        .map(|row| {
            row.iter()
                .map(|item| {
                    if Some(item.label) == last_sent {
                        format!("[*{:>4}*]", item.label)
                    } else {
                        format!("[ {:>4} ]", item.label)
                    }
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

const HELP: &str = "Commands: connect (c), disconnect (d), status (s), grid (g), quit (q), \
                    or a button label to transmit it.";

pub struct RemoteApp {
    // Services
    pub(crate) bluetooth: BluetoothService,
    pub(crate) advisory: Arc<dyn AdvisoryService>,
    pub(crate) haptics: Box<dyn Haptics>,

    // Events published by the Bluetooth service, platform callbacks and
    // advisory tasks
    pub(crate) event_sender: mpsc::UnboundedSender<AppEvent>,
    pub(crate) events: mpsc::UnboundedReceiver<AppEvent>,
    pub(crate) input: ConsoleInput,

    // State
    pub(crate) connection_state: ConnectionState,
    pub(crate) last_sent: Option<&'static str>,
    pub(crate) assistant_text: Option<String>,
}

impl RemoteApp {
    pub fn new(
        bluetooth: BluetoothService,
        event_sender: mpsc::UnboundedSender<AppEvent>,
        events: mpsc::UnboundedReceiver<AppEvent>,
        advisory: Arc<dyn AdvisoryService>,
        haptics: Box<dyn Haptics>,
        input: ConsoleInput,
    ) -> Self {
        Self {
            connection_state: bluetooth.state().clone(),
            bluetooth,
            advisory,
            haptics,
            event_sender,
            events,
            input,
            last_sent: None,
            assistant_text: None,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        println!("{}", format_header(&self.connection_state, None));
        println!("{}", format_grid(None));
        println!("{}", HELP);

        loop {
            tokio::select! {
                Some(event) = self.events.recv() => self.handle_event(event),
                line = console::next_line(&self.input) => {
                    let Some(line) = line else { break };
                    if !self.handle_line(&line).await {
                        break;
                    }
                }
            }
        }

        self.bluetooth.disconnect();
        info!("Panel closed");
        Ok(())
    }

    /// Apply one line of input. Returns `false` when the panel should exit.
    pub async fn handle_line(&mut self, line: &str) -> bool {
        if line.trim().is_empty() {
            return true;
        }

        match parse_command(line) {
            PanelCommand::Connect => {
                if self.bluetooth.state().status == ConnectionStatus::Connecting {
                    warn!("Connect ignored, a connection attempt is in progress");
                    return true;
                }
                // shown before the picker takes over the terminal
                self.show_state(ConnectionState::connecting());
                let state = self.bluetooth.connect().await;
                self.drain_events();
                if state.status == ConnectionStatus::Connected {
                    println!("{}", format_grid(self.last_sent));
                }
            }
            PanelCommand::Disconnect => {
                self.bluetooth.disconnect();
                self.drain_events();
            }
            PanelCommand::Status => self.print_status(),
            PanelCommand::Grid => {
                println!("{}", format_grid(self.last_sent));
                println!("{}", HELP);
            }
            PanelCommand::Quit => return false,
            PanelCommand::Press(item) => self.press(item).await,
            PanelCommand::Unknown => println!("Unknown command: {}", line.trim()),
        }
        true
    }

    /// Transmit a button's label. The advisory note for its value is
    /// fetched on a separate task and arrives later as an event.
    pub async fn press(&mut self, item: &'static GridValue) {
        if !self.bluetooth.state().accepts_commands() {
            warn!("Button {} ignored while connecting", item.label);
            return;
        }

        debug!(button = item.id, value = item.value, "Button pressed");
        self.last_sent = Some(item.label);
        self.assistant_text = None;
        if self.bluetooth.send(item.label).await {
            println!("Command sent: {}", item.label);
        } else {
            println!("Command failed: {}", item.label);
        }
        self.haptics.pulse(PRESS_PULSE);

        self.request_advisory(item);
    }

    fn request_advisory(&self, item: &'static GridValue) {
        let advisory = Arc::clone(&self.advisory);
        let sender = self.event_sender.clone();
        tokio::spawn(async move {
            let text = advisory.describe(item.value).await;
            let _ = sender.send(AppEvent::AdvisoryText {
                label: item.label,
                text,
            });
        });
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::ConnectionStatus(state) => {
                self.show_state(state);
            }
            AppEvent::LogMessage(message) => print_message(&message),
            AppEvent::DeviceDisconnected { session_id } => {
                self.bluetooth.handle_disconnection(session_id);
            }
            AppEvent::AdvisoryText { label, text } => {
                if self.last_sent != Some(label) {
                    debug!("Dropping advisory for earlier press {}", label);
                    return;
                }
                if let Some(text) = &text {
                    println!("\u{201c}{}\u{201d}", text);
                }
                self.assistant_text = text;
            }
        }
    }

    /// Record `state` and print the header if it changed. Returns whether
    /// anything was printed.
    pub(crate) fn show_state(&mut self, state: ConnectionState) -> bool {
        if state == self.connection_state {
            return false;
        }
        self.connection_state = state;
        let name = self.bluetooth.device_name();
        println!("{}", format_header(&self.connection_state, name.as_deref()));
        true
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
        }
    }

    fn print_status(&self) {
        let name = self.bluetooth.device_name();
        println!("{}", format_header(&self.connection_state, name.as_deref()));
        match self.last_sent {
            Some(label) => println!("Last command: {}", label),
            None => println!("Select an input to transmit"),
        }
        if self.connection_state.status == ConnectionStatus::Disconnected {
            println!("Type 'connect' to pair with your device.");
        }
    }
}

fn print_message(message: &StatusMessage) {
    let prefix = match message.severity {
        MessageSeverity::Info => "·",
        MessageSeverity::Success => "✔",
        MessageSeverity::Warning => "!",
        MessageSeverity::Error => "✖",
    };
    println!("{} {}", prefix, message.message);
}
