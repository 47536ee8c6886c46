// SPDX-License-Identifier: MIT

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use stepwise_rs::adk::model::{Content, Part};
use stepwise_rs::stepwise::apps::{birthdate, idea_vault, tool_loop};
use stepwise_rs::stepwise::config::{BackendConfig, LOCAL_BASE_URL, LOCAL_MODEL};
use stepwise_rs::stepwise::server;
use stepwise_rs::stepwise::tools::{CalculateAgeTool, SendEmailTool};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum App {
    IdeaVault,
    Birthdate,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Prebuilt ReAct agent
    React,
    /// Hand-built chatbot/tools graph
    Graph,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve one of the web demos
    Serve {
        #[arg(value_enum)]
        app: App,

        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(short, long, default_value_t = 5000)]
        port: u16,

        /// Directory holding index.html (defaults to static/<app>)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
    /// Run the tool loop demo
    Demo {
        #[arg(short, long, value_enum, default_value = "react")]
        mode: Mode,

        /// Question to ask; runs the built-in questions when omitted
        #[arg(short, long)]
        prompt: Option<String>,
    },
    /// Run the birthdate pipeline for one person
    Run {
        #[arg(short, long)]
        name: String,
    },
    /// Run the idea vault workflow once and wait for it
    Idea {
        #[arg(short, long)]
        idea: String,
    },
}

fn print_messages(messages: &[Content]) {
    for message in messages {
        println!("================ {} ================", message.role);
        for part in &message.parts {
            match part {
                Part::Text(text) => println!("{}", text),
                Part::FunctionCall { id, name, args } => {
                    println!("Tool call {} ({}): {}", name, id, args)
                }
                Part::FunctionResponse { id, name, response } => {
                    println!("Tool result {} ({}): {}", name, id, response)
                }
            }
        }
    }
}

fn birthdate_config() -> anyhow::Result<BackendConfig> {
    dotenv::from_filename("config.env").ok();
    dotenv::from_filename("secret.env").ok();
    Ok(BackendConfig::from_env_or(LOCAL_BASE_URL, LOCAL_MODEL)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Serve {
            app,
            host,
            port,
            static_dir,
        } => {
            let addr: SocketAddr = format!("{}:{}", host, port)
                .parse()
                .with_context(|| format!("invalid listen address {}:{}", host, port))?;

            let router = match app {
                App::IdeaVault => {
                    let config = BackendConfig::from_env()?;
                    let workflow = idea_vault::build_workflow(
                        config.build_model(),
                        SendEmailTool::new(),
                        config.step_limit,
                    )?;
                    let dir = static_dir.unwrap_or_else(|| PathBuf::from("static/idea-vault"));
                    server::idea_vault::router(Arc::new(workflow), server::JobStore::new(), &dir)
                }
                App::Birthdate => {
                    let config = birthdate_config()?;
                    let workflow = birthdate::build_workflow(
                        config.build_model(),
                        CalculateAgeTool::new(),
                        config.step_limit,
                    )?;
                    let dir = static_dir.unwrap_or_else(|| PathBuf::from("static/birthdate"));
                    server::birthdate::router(Arc::new(workflow), &dir)
                }
            };

            server::serve(router, addr).await?;
        }
        Commands::Demo { mode, prompt } => {
            let config = BackendConfig::from_env()?;
            let model = config.build_model();

            let greeting = model
                .generate_content(&[Content::user("Hello")], None, &[])
                .await?;
            println!("{}", greeting.text());

            let questions: Vec<String> = match prompt {
                Some(p) => vec![p],
                None => tool_loop::DEMO_PROMPTS.iter().map(|q| q.to_string()).collect(),
            };

            let workflow = match mode {
                Mode::React => {
                    println!("Option 1: using prebuilt ReAct agent loop");
                    let max_iterations = (config.step_limit + 1) / 2;
                    tool_loop::react_agent(model, max_iterations)?.workflow().clone()
                }
                Mode::Graph => {
                    println!("Option 2: building a graph with tool loop");
                    tool_loop::chatbot_graph(model, config.step_limit)?
                }
            };

            for question in questions {
                let execution = tool_loop::ask(&workflow, &question).await?;
                print_messages(execution.state.messages());
                if execution.halted {
                    println!("(stopped after {} steps)", execution.steps);
                }
            }
        }
        Commands::Run { name } => {
            let config = birthdate_config()?;
            let workflow = birthdate::build_workflow(
                config.build_model(),
                CalculateAgeTool::new(),
                config.step_limit,
            )?;
            let age = birthdate::age_of(&workflow, &name).await?;
            println!("Age of {}: {}", name, age);
        }
        Commands::Idea { idea } => {
            let config = BackendConfig::from_env()?;
            let email = SendEmailTool::new();
            let workflow =
                idea_vault::build_workflow(config.build_model(), email.clone(), config.step_limit)?;

            let state = workflow
                .invoke(idea_vault::initial_state(&workflow, &idea))
                .await?;
            print_messages(state.messages());
            for sent in email.outbox().await {
                println!("Sent email '{}'", sent.subject);
            }
        }
    }

    Ok(())
}
