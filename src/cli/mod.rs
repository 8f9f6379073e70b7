mod parse;

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::node::Node;
use crate::repl::{HandleUserInput, HandleUserInputError, Repl};
use crate::send::SlotState;

pub use parse::{parse_command, ParseError, USAGE};

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    ListRoutes(Option<String>),
    ListInterfaces(Option<String>),
    Stats,
    Help,
    Quit,
    None,
}

pub struct Cli {
    node: Arc<Node>,
}

#[async_trait]
impl HandleUserInput for Cli {
    async fn handle(&mut self, user_input: String) -> Result<(), HandleUserInputError> {
        match parse::parse_command(user_input) {
            Ok(Command::Quit) => return Err(HandleUserInputError::Terminate),
            Ok(Command::None) => (),
            Ok(cmd) => self.execute_command(cmd).await,
            Err(e) => {
                eprintln!("{e}");
            }
        };

        Ok(())
    }
}

impl Cli {
    pub fn new(node: Arc<Node>) -> Self {
        Self { node }
    }

    /// Serve console commands on stdin until `quit` or end of input.
    pub async fn run(self) {
        Repl::new(self, Some(">> ".into())).serve().await;
    }

    async fn execute_command(&self, cmd: Command) {
        match cmd {
            Command::ListRoutes(file) => self.output(self.format_routes(), file).await,
            Command::ListInterfaces(file) => self.output(self.format_interfaces(), file).await,
            Command::Stats => print!("{}", self.format_stats()),
            Command::Help => println!("{}", USAGE),
            Command::Quit | Command::None => (),
        }
    }

    async fn output(&self, text: String, file: Option<String>) {
        match file {
            Some(path) => {
                if let Err(e) = tokio::fs::write(&path, text).await {
                    eprintln!("Failed to write {}: {}", path, e);
                }
            }
            None => print!("{}", text),
        }
    }

    fn format_routes(&self) -> String {
        let routes = self.node.routes();
        let now = Instant::now();
        let mut out = String::from("prefix\tnext hop\tmetric\ttype\tiface\tage\n");
        for route in routes.snapshot() {
            let _ = writeln!(out, "{}\t{}s", route, route.age(now).as_secs());
        }
        let _ = writeln!(out, "{} of {} entries used", routes.len(), routes.capacity());
        out
    }

    fn format_interfaces(&self) -> String {
        let mut out = String::from("id\taddress\tstate\tlink\n");
        for (id, addr) in self.node.addresses().iter().enumerate() {
            let state = match self.node.scheduler().state(id) {
                Some(SlotState::Idle) => "idle",
                Some(SlotState::Sending) => "sending",
                None => "missing",
            };
            let link = self
                .node
                .transport()
                .describe(id)
                .unwrap_or_else(|| "-".into());
            let _ = writeln!(out, "{}\t{}\t{}\t{}", id, addr, state, link);
        }
        out
    }

    fn format_stats(&self) -> String {
        let stats = self.node.scheduler().stats();
        format!(
            "sent\t{}\nfailed\t{}\nbusy\t{}\n",
            stats.sent, stats.failed, stats.busy_drops
        )
    }
}
