//! CLI wizard: stdin/stdout REPL over one wizard session, for local testing.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use crate::config::ReplyPacing;
use crate::error::WizardError;
use crate::wizard::finalize::{FinalizeOutcome, Finalizer};
use crate::wizard::machine::Selection;
use crate::wizard::session::{SessionEvent, WizardSession};
use crate::wizard::transcript::Speaker;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text for the wizard.
    Text(String),
    /// `/sex male`, `/diet keto`, `/yes`, `/no`.
    Select { kind: String, value: String },
    Reset,
    Finalize,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Text(line.to_string());
        };

        let (name, arg) = rest.split_once(' ').unwrap_or((rest, ""));
        let arg = arg.trim().to_string();
        match name {
            "sex" | "diet" => Self::Select {
                kind: name.to_string(),
                value: arg,
            },
            "yes" | "no" => Self::Select {
                kind: "confirm".to_string(),
                value: name.to_string(),
            },
            "reset" => Self::Reset,
            "done" | "finalize" => Self::Finalize,
            "quit" | "exit" => Self::Quit,
            _ => Self::Help,
        }
    }
}

const HELP: &str = "Commands: /sex male|female, /diet <name>, /yes, /no, /reset, /done, /quit";

/// A local wizard session driven from the terminal.
pub struct WizardRepl {
    session: Arc<WizardSession>,
    finalizer: Finalizer,
}

impl WizardRepl {
    pub fn new(pacing: ReplyPacing, finalizer: Finalizer) -> Self {
        Self {
            session: Arc::new(WizardSession::new(pacing)),
            finalizer,
        }
    }

    pub fn session(&self) -> &Arc<WizardSession> {
        &self.session
    }

    /// Read lines until EOF or `/quit`.
    pub async fn run(&self) {
        let printer = self.spawn_printer();
        for entry in self.session.transcript().await {
            println!("\n{}\n", entry.text);
        }

        let reader = BufReader::new(tokio::io::stdin());
        let mut lines = reader.lines();
        eprint!("> ");

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        eprint!("> ");
                        continue;
                    }
                    if !self.handle(Command::parse(&line)).await {
                        break;
                    }
                    self.session.settle().await;
                    eprint!("> ");
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Error reading stdin: {}", e);
                    break;
                }
            }
        }

        printer.abort();
    }

    /// Apply one command. Returns false when the REPL should stop.
    pub async fn handle(&self, command: Command) -> bool {
        let result: Result<(), WizardError> = match command {
            Command::Text(text) => self.session.send_text(&text).await.map(|_| ()),
            Command::Select { kind, value } => match Selection::parse(&kind, &value) {
                Ok(selection) => self.session.select(selection).await.map(|_| ()),
                Err(e) => Err(e),
            },
            Command::Reset => {
                self.session.reset().await;
                Ok(())
            }
            Command::Finalize => {
                self.finalize().await;
                Ok(())
            }
            Command::Help => {
                eprintln!("{HELP}");
                Ok(())
            }
            Command::Quit => return false,
        };

        if let Err(e) = result {
            eprintln!("⚠️  {e}");
            if matches!(e, WizardError::UnexpectedEvent { .. }) {
                eprintln!("{HELP}");
            }
        }
        true
    }

    async fn finalize(&self) {
        match self.session.finalize(&self.finalizer).await {
            Ok(FinalizeOutcome::Proceed { next, profile, .. }) => {
                eprintln!(
                    "✅ Saved: {} / {}세 / {}cm / {}kg / {} (BMI {}) → {}",
                    profile.sex,
                    profile.age,
                    profile.height_cm,
                    profile.weight_kg,
                    profile.diet,
                    profile.bmi_display(),
                    next.path()
                );
            }
            Ok(FinalizeOutcome::AlreadySubmitting) => eprintln!("⏳ Already submitting"),
            Err(e) => eprintln!("❌ {e}"),
        }
    }

    fn spawn_printer(&self) -> JoinHandle<()> {
        let mut rx = self.session.subscribe();
        tokio::spawn(async move {
            while let Ok(event) = rx.recv().await {
                match event {
                    SessionEvent::Entry { entry } if entry.speaker == Speaker::Assistant => {
                        println!("\n{}\n", entry.text);
                    }
                    SessionEvent::Reset => println!("\n🔄 다시 시작합니다\n"),
                    _ => {}
                }
            }
        })
    }
}
