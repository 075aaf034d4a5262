use super::{parse_command, ControlInput, ControlSignal};
use crossbeam_channel::{unbounded, Receiver};
use std::io::{self, BufRead, BufReader};
use std::thread;

/// Keyboard control through the terminal: one command per line.
///
/// A background thread blocks on the reader and forwards signals over a
/// channel, so `poll` never waits.
pub struct StdinControl {
    signals: Receiver<ControlSignal>,
}

impl StdinControl {
    pub fn spawn() -> io::Result<Self> {
        Self::from_reader(BufReader::new(io::stdin()))
    }

    pub fn from_reader<R>(reader: R) -> io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (sender, signals) = unbounded();

        thread::Builder::new()
            .name("control-input".to_string())
            .spawn(move || {
                for line in reader.lines() {
                    let Ok(line) = line else { break };
                    match parse_command(&line) {
                        Some(signal) => {
                            if sender.send(signal).is_err() {
                                break;
                            }
                        }
                        None => tracing::debug!("Ignoring command {:?}", line),
                    }
                }
                tracing::debug!("Control input closed");
            })?;

        Ok(Self { signals })
    }
}

impl ControlInput for StdinControl {
    fn poll(&mut self) -> Option<ControlSignal> {
        self.signals.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    #[test]
    fn forwards_commands_in_order() {
        let control = StdinControl::from_reader(Cursor::new("c\nhello\nq\n")).unwrap();

        let timeout = Duration::from_secs(5);
        assert_eq!(control.signals.recv_timeout(timeout), Ok(ControlSignal::Recapture));
        assert_eq!(control.signals.recv_timeout(timeout), Ok(ControlSignal::Quit));
    }

    #[test]
    fn poll_is_empty_after_input_ends() {
        let mut control = StdinControl::from_reader(Cursor::new("")).unwrap();

        // Wait for the reader thread to hang up
        while control.signals.recv_timeout(Duration::from_secs(5)).is_ok() {}
        assert_eq!(control.poll(), None);
    }
}
