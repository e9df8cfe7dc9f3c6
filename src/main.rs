use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use switchcon::bluetooth::BluezAdapter;
use switchcon::config::{AppConfig, CONFIG_ENV};
use switchcon::input::{parse_frame, InputFrame, MacroError};
use switchcon::logging::init_logging;
use switchcon::session::{
    AdapterLock, ControllerServer, SessionError, SessionEvent, SessionSettings, StatusSink,
    StatusUpdate, TaskRequest,
};
use switchcon::transport::L2capConnector;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

const TASK_QUEUE: usize = 32;

/// Input handles of one running controller session.
struct ControllerFeed {
    tasks: mpsc::Sender<TaskRequest>,
    live: watch::Sender<InputFrame>,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = config_path();
    let config = AppConfig::load_or_create(&config_path)
        .map_err(|e| eyre!("Failed to load configuration: {}", e))?;
    let logging = init_logging(&config.logging)?;
    info!("Using configuration {}", config_path.display());

    if config.controllers.is_empty() {
        return Err(eyre!(
            "No controllers configured in {}",
            config_path.display()
        ));
    }

    let settings = SessionSettings::from(&config.session);
    let lock = AdapterLock::new();
    let (status_tx, status_rx) = mpsc::unbounded_channel();
    let mut sessions = JoinSet::new();
    let mut feeds = Vec::new();

    for (index, controller) in config.controllers.iter().enumerate() {
        let adapter = BluezAdapter::open(&controller.adapter_path).map_err(|e| {
            eyre!(
                "Failed to open adapter {} for controller {}: {}",
                controller.adapter_path,
                index,
                e
            )
        })?;

        let (task_tx, task_rx) = mpsc::channel(TASK_QUEUE);
        let (live_tx, live_rx) = watch::channel(InputFrame::neutral());
        let server = ControllerServer::new(
            controller.kind,
            controller.body_color,
            controller.button_color,
            Box::new(adapter),
            Box::new(L2capConnector),
        )
        .with_settings(settings.clone())
        .with_lock(lock.clone())
        .with_status(StatusSink::new(index, status_tx.clone()))
        .with_tasks(task_rx)
        .with_live_input(live_rx);

        let reconnect_address = controller.reconnect_address;
        info!("Starting controller {} ({})", index, controller.kind);
        sessions.spawn_blocking(move || server.run(reconnect_address));
        feeds.push(ControllerFeed {
            tasks: task_tx,
            live: live_tx,
        });
    }
    drop(status_tx);

    tokio::spawn(observe_status(status_rx));
    tokio::spawn(read_commands(feeds));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.map_err(|e| eyre!("Failed to listen for ctrl-c: {}", e))?;
            info!("Interrupted, shutting down");
        }
        _ = wait_for_sessions(&mut sessions) => {
            info!("All controller sessions ended");
        }
    }

    // Blocking session loops cannot be cancelled; flush logs and leave.
    drop(logging);
    std::process::exit(0);
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    Ok(())
}

fn config_path() -> PathBuf {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        .unwrap_or_else(AppConfig::default_path)
}

async fn wait_for_sessions(sessions: &mut JoinSet<Result<(), SessionError>>) {
    while let Some(result) = sessions.join_next().await {
        log_session_end(result);
    }
}

fn log_session_end(result: Result<Result<(), SessionError>, JoinError>) {
    match result {
        Ok(Ok(())) => debug!("Controller session finished"),
        Ok(Err(e)) => error!("Controller session failed: {}", e),
        Err(e) => error!("Controller session panicked: {}", e),
    }
}

async fn observe_status(mut updates: mpsc::UnboundedReceiver<StatusUpdate>) {
    while let Some(update) = updates.recv().await {
        let at = update.at.format("%H:%M:%S%.3f");
        match update.event {
            SessionEvent::State(state) => {
                info!("[controller {}] {} at {}", update.controller, state, at)
            }
            SessionEvent::Crashed { errors } => {
                error!("[controller {}] crashed at {}: {}", update.controller, at, errors)
            }
            SessionEvent::MacroFinished { macro_id } => {
                info!("[controller {}] macro {} finished", update.controller, macro_id)
            }
        }
    }
    debug!("All status senders dropped");
}

#[derive(Debug, PartialEq)]
enum FeedCommand {
    Task(TaskRequest),
    Hold(InputFrame),
    Release,
}

/// Parses one stdin line: `[index:] clear | stop <id> | hold <tokens> |
/// release | <macro script>`. Scripts may use `\n` for line breaks.
fn parse_command(line: &str, next_id: &mut u64) -> Result<(usize, FeedCommand), MacroError> {
    let (index, rest) = line
        .split_once(':')
        .and_then(|(prefix, rest)| Some((prefix.trim().parse::<usize>().ok()?, rest.trim())))
        .unwrap_or((0, line.trim()));

    let (verb, args) = rest.split_once(' ').unwrap_or((rest, ""));
    let command = match verb {
        "clear" => FeedCommand::Task(TaskRequest::ClearMacros),
        "stop" => FeedCommand::Task(TaskRequest::StopMacro {
            macro_id: args.trim().to_string(),
        }),
        "hold" => FeedCommand::Hold(parse_frame(args)?),
        "release" => FeedCommand::Release,
        _ => {
            *next_id += 1;
            FeedCommand::Task(TaskRequest::RunMacro {
                macro_id: format!("stdin-{}", next_id),
                script: rest.replace("\\n", "\n"),
            })
        }
    };
    Ok((index, command))
}

async fn read_commands(feeds: Vec<ControllerFeed>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut next_id = 0;
    info!("Reading macros from stdin");

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read stdin: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let (index, command) = match parse_command(&line, &mut next_id) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Ignoring input line: {}", e);
                continue;
            }
        };
        let Some(feed) = feeds.get(index) else {
            warn!("No controller with index {}", index);
            continue;
        };

        match command {
            FeedCommand::Task(request) => {
                if let TaskRequest::RunMacro { macro_id, .. } = &request {
                    info!("Queued macro {} for controller {}", macro_id, index);
                }
                if let Err(e) = feed.tasks.send(request).await {
                    warn!("Controller {} no longer accepts tasks: {}", index, e);
                }
            }
            FeedCommand::Hold(frame) => {
                feed.live.send_replace(frame);
            }
            FeedCommand::Release => {
                feed.live.send_replace(InputFrame::neutral());
            }
        }
    }
    debug!("Stdin closed, no further input");
}
