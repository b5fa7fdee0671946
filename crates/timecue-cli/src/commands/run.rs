use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use chrono_tz::Tz;
use timecue_core::config::parse_timezone;
use timecue_core::{
    Assistant, Composer, Config, ConfigError, LlmClient, Notifier, SystemClock, TimetableError,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::console::{ConsoleCommand, ConsoleNotifier, HELP};

type Error = Box<dyn std::error::Error>;

pub const STARTUP_TITLE: &str = "timecue";
pub const STARTUP_MESSAGE: &str = "App started! Testing notifications.";

/// Run the scheduler until `quit` or Ctrl-C.
pub fn run(config_path: &Path) -> Result<(), Error> {
    let (config, timetable) = super::load(config_path)?;
    if timetable.is_empty() {
        return Err(TimetableError::Empty {
            path: config.timetable_file.clone(),
        }
        .into());
    }

    let notifier = Arc::new(ConsoleNotifier);
    let clock = Arc::new(SystemClock::new(config.tz()?));
    let assistant = Arc::new(Assistant::new(
        timetable,
        config.notifications.clone(),
        LlmClient::from_config(&config.llm)?,
        notifier.clone(),
        clock.clone(),
    ));

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(async move {
        notifier.emit(STARTUP_TITLE, STARTUP_MESSAGE);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler = {
            let assistant = assistant.clone();
            tokio::spawn(async move { assistant.run(shutdown_rx).await })
        };

        println!("timecue running in {}. {HELP}", clock.timezone());

        let stdin = BufReader::new(tokio::io::stdin());
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("cannot listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        };
        console(&assistant, &config, &clock, stdin, ctrl_c).await;

        let _ = shutdown_tx.send(true);
        scheduler.await?;
        println!("stopped");
        Ok::<_, Error>(())
    });

    // A pending stdin read sits on a blocking thread that would otherwise
    // keep the process alive until the next newline.
    runtime.shutdown_background();
    result
}

/// Read console commands from `input` until `quit`, end of input followed by
/// `shutdown`, or `shutdown` alone. Manual evaluations still in flight are
/// awaited before returning.
pub async fn console<C, R>(
    assistant: &Arc<Assistant<C>>,
    config: &Config,
    clock: &SystemClock,
    input: R,
    shutdown: impl Future<Output = ()>,
) where
    C: Composer + 'static,
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut input_open = true;
    let mut manual = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        tracing::debug!("stdin closed, console commands disabled");
                        input_open = false;
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!("stdin read failed: {e}");
                        input_open = false;
                        continue;
                    }
                };

                match ConsoleCommand::parse(&line) {
                    ConsoleCommand::Notify => {
                        let assistant = assistant.clone();
                        manual.spawn(async move {
                            if assistant.evaluate().await.is_none() {
                                println!("no notification due");
                            }
                        });
                    }
                    ConsoleCommand::SetTimezone(zone) => match switch_timezone(config, clock, &zone) {
                        Ok(tz) => println!("time zone set to {tz}"),
                        Err(e) => println!("{e}"),
                    },
                    ConsoleCommand::Quit => break,
                    ConsoleCommand::Help => println!("{HELP}"),
                    ConsoleCommand::Empty => {}
                    ConsoleCommand::Unknown(input) => {
                        println!("unknown command: {input}. {HELP}");
                    }
                }
            }
            Some(_) = manual.join_next(), if !manual.is_empty() => {}
            _ = &mut shutdown => break,
        }
    }

    if !manual.is_empty() {
        tracing::info!(pending = manual.len(), "waiting for manual notifications");
    }
    while manual.join_next().await.is_some() {}
}

/// Evaluate once with fresh throttling state.
pub fn notify_once(config_path: &Path) -> Result<(), Error> {
    let (config, timetable) = super::load(config_path)?;
    let assistant = Assistant::new(
        timetable,
        config.notifications.clone(),
        LlmClient::from_config(&config.llm)?,
        Arc::new(ConsoleNotifier),
        Arc::new(SystemClock::new(config.tz()?)),
    );

    let runtime = tokio::runtime::Runtime::new()?;
    if runtime.block_on(assistant.evaluate()).is_none() {
        println!("no notification due");
    }
    Ok(())
}

/// Switch the clock to `zone` if the config allows it.
pub fn switch_timezone(config: &Config, clock: &SystemClock, zone: &str) -> Result<Tz, ConfigError> {
    if !config.timezone_list.iter().any(|z| z == zone) {
        return Err(ConfigError::InvalidValue {
            key: "timezone".into(),
            message: format!(
                "'{zone}' is not one of: {}",
                config.timezone_list.join(", ")
            ),
        });
    }
    let tz = parse_timezone("timezone", zone)?;
    clock.set_timezone(tz);
    Ok(tz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::NaiveTime;
    use timecue_core::notify::RecordingNotifier;
    use timecue_core::{ChatMessage, ComposeOutcome, NotificationsConfig, Timetable, TimetableEntry};

    /// Takes a while to answer, like a slow endpoint.
    struct SlowComposer;

    impl Composer for SlowComposer {
        async fn compose(&self, _prompt: &str, _history: &[ChatMessage]) -> ComposeOutcome {
            tokio::time::sleep(Duration::from_millis(200)).await;
            ComposeOutcome::Composed("still on it".into())
        }
    }

    fn all_day_focus(clock: Arc<SystemClock>) -> (Arc<Assistant<SlowComposer>>, Arc<RecordingNotifier>) {
        let table = Timetable::new(vec![TimetableEntry::new(NaiveTime::from_hms_opt(0, 0, 0).unwrap(), "Focus")]);
        let notifier = Arc::new(RecordingNotifier::new());
        let assistant = Assistant::new(
            table,
            NotificationsConfig::default(),
            SlowComposer,
            notifier.clone(),
            clock,
        );
        (Arc::new(assistant), notifier)
    }

    #[test]
    fn switch_timezone_accepts_listed_zones_only() {
        let config = Config::default();
        let clock = SystemClock::new(chrono_tz::Asia::Kolkata);

        let tz = switch_timezone(&config, &clock, "America/New_York").unwrap();
        assert_eq!(tz, chrono_tz::America::New_York);
        assert_eq!(clock.timezone(), chrono_tz::America::New_York);

        let err = switch_timezone(&config, &clock, "Europe/Paris").unwrap_err();
        assert!(err.to_string().contains("Asia/Kolkata"));
        assert_eq!(clock.timezone(), chrono_tz::America::New_York);
    }

    #[tokio::test]
    async fn quit_waits_for_manual_notification() {
        let clock = Arc::new(SystemClock::new(chrono_tz::UTC));
        let (assistant, notifier) = all_day_focus(clock.clone());

        let input: &[u8] = b"notify\nquit\n";
        console(&assistant, &Config::default(), &clock, input, std::future::pending()).await;

        assert_eq!(
            notifier.sent(),
            vec![("Check-in: Focus".to_string(), "still on it".to_string())]
        );
    }

    #[tokio::test]
    async fn console_handles_set_tz_then_shutdown() {
        let clock = Arc::new(SystemClock::new(chrono_tz::UTC));
        let (assistant, notifier) = all_day_focus(clock.clone());

        let input: &[u8] = b"set_tz America/New_York\nset_tz Mars/Base\n";
        console(&assistant, &Config::default(), &clock, input, async {
            tokio::time::sleep(Duration::from_millis(50)).await;
        })
        .await;

        assert_eq!(clock.timezone(), chrono_tz::America::New_York);
        assert!(notifier.sent().is_empty());
    }
}
