//! Scriptable SMTP server for exercising the pump end to end.
//!
//! Serves any number of transactions per connection, records everything it
//! receives, and can inject per-recipient refusals or a silent connection
//! drop to simulate transport failure.
#![allow(dead_code)] // Test utility module - not all methods used in every test

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::Mutex,
    task::JoinHandle,
};

/// A command observed by the mock server, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmtpCommand {
    Ehlo(String),
    MailFrom(String),
    RcptTo(String),
    Data,
    MessageContent(String),
    Rset,
    Quit,
    Other(String),
}

#[derive(Debug, Clone, Default)]
struct Script {
    /// Refuse RCPT TO with 550 when the argument contains this marker.
    reject_recipient: Option<String>,
    /// Close the connection without replying when MAIL FROM contains
    /// this marker.
    drop_on_mail_from: Option<String>,
}

/// Handle to a running mock server.
pub struct MockSmtpServer {
    addr: SocketAddr,
    commands: Arc<Mutex<Vec<SmtpCommand>>>,
    connections: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl MockSmtpServer {
    #[must_use]
    pub fn builder() -> MockSmtpServerBuilder {
        MockSmtpServerBuilder {
            script: Script::default(),
        }
    }

    /// Starts a server with the default all-accepting script.
    pub async fn start() -> std::io::Result<Self> {
        Self::builder().build().await
    }

    #[must_use]
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Number of connections accepted so far.
    #[must_use]
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Everything received so far, in order.
    pub async fn commands(&self) -> Vec<SmtpCommand> {
        self.commands.lock().await.clone()
    }

    /// The MAIL FROM arguments received so far, in order.
    pub async fn mail_froms(&self) -> Vec<String> {
        self.commands
            .lock()
            .await
            .iter()
            .filter_map(|command| match command {
                SmtpCommand::MailFrom(from) => Some(from.clone()),
                _ => None,
            })
            .collect()
    }

    /// The message bodies received so far, in order.
    pub async fn messages(&self) -> Vec<String> {
        self.commands
            .lock()
            .await
            .iter()
            .filter_map(|command| match command {
                SmtpCommand::MessageContent(content) => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn shutdown(&self) {
        self.handle.abort();
    }

    async fn handle_client(
        stream: TcpStream,
        script: Script,
        commands: Arc<Mutex<Vec<SmtpCommand>>>,
    ) -> std::io::Result<()> {
        let mut stream = stream;
        let (reader, mut writer) = stream.split();
        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        writer.write_all(b"220 mock.test ESMTP ready\r\n").await?;
        writer.flush().await?;

        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                return Ok(());
            }

            let cmd_line = line.trim().to_owned();
            let mut parts = cmd_line.splitn(2, ' ');
            let verb = parts.next().unwrap_or("").to_uppercase();
            let argument = parts.next().unwrap_or("").to_owned();

            let response: &[u8] = match verb.as_str() {
                "EHLO" => {
                    commands.lock().await.push(SmtpCommand::Ehlo(argument));
                    b"250-mock.test\r\n250-SIZE 10485760\r\n250 OK\r\n"
                }
                "HELO" => {
                    commands.lock().await.push(SmtpCommand::Ehlo(argument));
                    b"250 mock.test\r\n"
                }
                "MAIL" => {
                    commands
                        .lock()
                        .await
                        .push(SmtpCommand::MailFrom(argument.clone()));
                    if script
                        .drop_on_mail_from
                        .as_ref()
                        .is_some_and(|marker| argument.contains(marker.as_str()))
                    {
                        // Vanish mid-transaction.
                        return Ok(());
                    }
                    b"250 OK\r\n"
                }
                "RCPT" => {
                    commands
                        .lock()
                        .await
                        .push(SmtpCommand::RcptTo(argument.clone()));
                    if script
                        .reject_recipient
                        .as_ref()
                        .is_some_and(|marker| argument.contains(marker.as_str()))
                    {
                        b"550 mailbox unavailable\r\n"
                    } else {
                        b"250 OK\r\n"
                    }
                }
                "DATA" => {
                    commands.lock().await.push(SmtpCommand::Data);
                    writer
                        .write_all(b"354 Start mail input; end with <CRLF>.<CRLF>\r\n")
                        .await?;
                    writer.flush().await?;

                    let mut content = String::new();
                    loop {
                        line.clear();
                        if reader.read_line(&mut line).await? == 0 {
                            return Ok(());
                        }
                        if line.trim_end() == "." {
                            break;
                        }
                        content.push_str(&line);
                    }
                    commands
                        .lock()
                        .await
                        .push(SmtpCommand::MessageContent(content));
                    b"250 OK: message accepted\r\n"
                }
                "RSET" => {
                    commands.lock().await.push(SmtpCommand::Rset);
                    b"250 OK\r\n"
                }
                "QUIT" => {
                    commands.lock().await.push(SmtpCommand::Quit);
                    writer.write_all(b"221 Bye\r\n").await?;
                    writer.flush().await?;
                    return Ok(());
                }
                "AUTH" => {
                    commands.lock().await.push(SmtpCommand::Other(cmd_line));
                    b"235 Authentication successful\r\n"
                }
                _ => {
                    commands.lock().await.push(SmtpCommand::Other(cmd_line));
                    b"500 Unknown command\r\n"
                }
            };

            writer.write_all(response).await?;
            writer.flush().await?;
        }
    }
}

impl Drop for MockSmtpServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Builder for a [`MockSmtpServer`].
pub struct MockSmtpServerBuilder {
    script: Script,
}

impl MockSmtpServerBuilder {
    /// Refuse RCPT TO with 550 when the argument contains `marker`.
    #[must_use]
    pub fn reject_recipient(mut self, marker: impl Into<String>) -> Self {
        self.script.reject_recipient = Some(marker.into());
        self
    }

    /// Silently close the connection when MAIL FROM contains `marker`,
    /// simulating a transport-level failure mid-run.
    #[must_use]
    pub fn drop_on_mail_from(mut self, marker: impl Into<String>) -> Self {
        self.script.drop_on_mail_from = Some(marker.into());
        self
    }

    /// Binds to an ephemeral port and starts serving.
    pub async fn build(self) -> std::io::Result<MockSmtpServer> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let commands = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));

        let script = self.script;
        let commands_task = Arc::clone(&commands);
        let connections_task = Arc::clone(&connections);

        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _peer)) = listener.accept().await else {
                    break;
                };
                connections_task.fetch_add(1, Ordering::SeqCst);

                let script = script.clone();
                let commands = Arc::clone(&commands_task);
                tokio::spawn(async move {
                    let _ = MockSmtpServer::handle_client(stream, script, commands).await;
                });
            }
        });

        Ok(MockSmtpServer {
            addr,
            commands,
            connections,
            handle,
        })
    }
}
