use std::thread;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};

use crate::rotator::{CancelToken, MotionController, RotatorBackend};
use crate::service::protocol::{parse_request, Request, HELP_TEXT};

struct Job {
    request: Request,
    reply: oneshot::Sender<String>,
}

/// Handle to the single command-executor thread that owns the rotator.
///
/// Every hardware command from every client funnels through one queue into
/// one thread, so there is never more than one active seek no matter how
/// many connections are open. `STOP` additionally trips the shared cancel
/// token so it can interrupt a seek that is already in flight instead of
/// queueing behind it.
#[derive(Clone)]
pub struct CommandExecutor {
    tx: mpsc::UnboundedSender<Job>,
    cancel: CancelToken,
}

impl CommandExecutor {
    /// Move the controller onto its own thread and return the queue handle.
    pub fn spawn<B>(mut controller: MotionController<B>) -> Self
    where
        B: RotatorBackend + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let cancel = CancelToken::new();
        let cancel_for_thread = cancel.clone();

        thread::spawn(move || {
            while let Some(job) = rx.blocking_recv() {
                let response = execute(&mut controller, &cancel_for_thread, job.request);
                // A client that vanished mid-command just loses its reply.
                let _ = job.reply.send(response);
            }
            // Queue closed; leave the motors stopped on the way out.
            if let Err(e) = controller.stop_motion() {
                log::error!("Stop on executor shutdown failed: {e}");
            }
        });

        Self { tx, cancel }
    }

    /// Interrupt whatever seek the executor is currently running.
    pub fn cancel_active_seek(&self) {
        self.cancel.cancel();
    }

    /// Queue one request and wait for its response line.
    pub async fn submit(&self, request: Request) -> String {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job = Job {
            request,
            reply: reply_tx,
        };
        if self.tx.send(job).is_err() {
            return "ERR command executor is gone".to_string();
        }
        reply_rx
            .await
            .unwrap_or_else(|_| "ERR command executor is gone".to_string())
    }
}

fn execute<B: RotatorBackend>(
    ctl: &mut MotionController<B>,
    cancel: &CancelToken,
    request: Request,
) -> String {
    match request {
        Request::Stop => match ctl.stop_motion() {
            Ok(()) => "OK stopped".to_string(),
            Err(e) => format!("ERR {e}"),
        },
        Request::MoveTo { az, el } => {
            // A STOP may have cancelled the previous seek; this command
            // starts a fresh one.
            cancel.clear();
            match ctl.move_to(az, el, cancel) {
                Ok(()) => {
                    let state = ctl.state();
                    format!(
                        "OK az={:.2} el={:.2}",
                        state.az_deg.unwrap_or(f64::NAN),
                        state.el_deg.unwrap_or(f64::NAN)
                    )
                }
                Err(e) => format!("ERR {e}"),
            }
        }
        Request::Left => jog(ctl, MotionController::move_az_left, "moving left"),
        Request::Right => jog(ctl, MotionController::move_az_right, "moving right"),
        Request::Up => jog(ctl, MotionController::move_el_up, "moving up"),
        Request::Down => jog(ctl, MotionController::move_el_down, "moving down"),
        Request::Read => match ctl.read_sensors() {
            Ok((az, el, power_on)) => format!(
                "AZ={az:.2} EL={el:.2} PWR={}",
                if power_on { "ON" } else { "OFF" }
            ),
            Err(e) => format!("ERR {e}"),
        },
        // Answered by the connection handler; kept total for safety.
        Request::Help => HELP_TEXT.to_string(),
        Request::Quit => "Goodbye!".to_string(),
    }
}

/// Open-ended jog in one direction. A failed drive write falls back to the
/// full stop before reporting, the same as any other actuation fault.
fn jog<B: RotatorBackend>(
    ctl: &mut MotionController<B>,
    start: fn(&mut MotionController<B>) -> Result<(), crate::rotator::RotatorError>,
    description: &str,
) -> String {
    match start(ctl) {
        Ok(()) => format!("OK {description}"),
        Err(e) => {
            if let Err(stop_err) = ctl.stop_motion() {
                log::error!("Fail-safe stop after jog fault failed: {stop_err}");
            }
            format!("ERR {e}")
        }
    }
}

/// Accept clients and serve the line protocol until the process exits.
pub async fn run_service(bind: &str, executor: CommandExecutor) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    log::info!("Rotator command service listening on {bind}");

    loop {
        let (stream, addr) = listener.accept().await?;
        log::info!("Client connected: {addr}");
        let executor = executor.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, &executor).await {
                log::warn!("Client {addr}: {e}");
            }
            // Whatever ended this connection, leave the rotator stopped.
            executor.cancel_active_seek();
            let _ = executor.submit(Request::Stop).await;
            log::info!("Client disconnected: {addr}");
        });
    }
}

async fn handle_client(stream: TcpStream, executor: &CommandExecutor) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    writer
        .write_all(b"Rotator command service. Type HELP for commands.\n")
        .await?;

    while let Some(line) = lines.next_line().await? {
        let response = match parse_request(&line) {
            Err(e) => format!("ERR {e}"),
            Ok(Request::Help) => HELP_TEXT.to_string(),
            Ok(Request::Quit) => {
                writer.write_all(b"Goodbye!\n").await?;
                return Ok(());
            }
            Ok(Request::Stop) => {
                executor.cancel_active_seek();
                executor.submit(Request::Stop).await
            }
            Ok(request) => executor.submit(request).await,
        };
        writer.write_all(response.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }

    Ok(())
}
