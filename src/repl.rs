use anyhow::Result;
use desk_core::config::AppConfig;
use desk_core::graph::ConversationGraph;
use desk_core::session::Session;
use desk_core::types::Message;
use rustyline::error::ReadlineError;
use rustyline::{Config as RlConfig, DefaultEditor};

const BANNER: &str = "\
Welcome to the Gym Assistant!
Type \"exit\" or \"quit\" to end the conversation.
";

/// Run the interactive session loop: one line in, one graph pass, one
/// `Assistant:` line out. A failed turn prints an `Error:` line and leaves
/// the history exactly as it was before the turn.
pub async fn run(config: AppConfig, graph: ConversationGraph) -> Result<()> {
    println!("{}", BANNER);

    let sessions_dir = config.session.sessions_dir();
    let mut session = Session::new();

    // Set up rustyline.
    let rl_config = RlConfig::builder().auto_add_history(true).build();
    let history_path = AppConfig::data_dir().join("repl_history.txt");
    let mut rl = DefaultEditor::with_config(rl_config)?;
    let _ = rl.load_history(&history_path);

    loop {
        match rl.readline("You: ") {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
                    println!("Goodbye!");
                    break;
                }

                // Run the turn against a candidate history; the session is
                // only updated once the turn succeeds.
                let user_msg = Message::user(input);
                let mut turn_history: Vec<Message> = session
                    .recent_messages(config.session.max_history)
                    .to_vec();
                turn_history.push(user_msg.clone());

                match graph.run_turn(&turn_history).await {
                    Ok(turn) => {
                        let reply = turn
                            .reply()
                            .map(|m| m.content.clone())
                            .unwrap_or_default();

                        session.push_message(user_msg);
                        for msg in turn.messages {
                            session.push_message(msg);
                        }
                        if config.session.auto_save {
                            if let Err(e) = session.save_to(&sessions_dir) {
                                tracing::warn!("Failed to save session: {}", e);
                            }
                        }

                        println!("Assistant: {}\n", reply);
                    }
                    Err(e) => {
                        println!("Error: {}\n", e);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    // Save input history.
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = rl.save_history(&history_path);

    Ok(())
}
