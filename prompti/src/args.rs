use clap::Parser;
use prompti_llm::{Message, Request};

/// Send one prompt to an LLM vendor
#[derive(Debug, Parser)]
#[command(name = "prompti", about = "Run a prompt against the configured model")]
pub struct Args {
    /// Path to a TOML or JSON configuration file, or an http(s) URL serving JSON
    #[arg(short, long, default_value = "prompti.toml", env = "PROMPTI_CONFIG")]
    pub config: String,

    /// Log filter directive
    #[arg(long, default_value = "info", env = "PROMPTI_LOG")]
    pub log: String,

    /// Stream the answer as it is generated
    #[arg(short, long)]
    pub stream: bool,

    /// System message sent before the prompt
    #[arg(long)]
    pub system: Option<String>,

    /// The prompt
    pub prompt: String,
}

impl Args {
    pub fn request(&self) -> Request {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system {
            messages.push(Message::system(system.clone()));
        }
        messages.push(Message::user(self.prompt.clone()));

        Request::new(messages).with_stream(self.stream)
    }
}
