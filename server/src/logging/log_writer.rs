use anyhow::Context;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing_subscriber::fmt::MakeWriter;

enum LogTask {
    Write(usize, Vec<u8>),
    Flush(usize),
    Reopen,
    AddFile(usize, PathBuf, File),
    Shutdown,
}

fn send_failed() -> io::Error {
    io::Error::other("Failed to send log task")
}

pub struct Writer<'a> {
    id: usize,
    sender: &'a mpsc::Sender<LogTask>,
}

impl Write for Writer<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sender
            .try_send(LogTask::Write(self.id, buf.to_vec()))
            .map_err(|_| send_failed())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sender
            .try_send(LogTask::Flush(self.id))
            .map_err(|_| send_failed())
    }
}

pub struct FileWriter {
    id: usize,
    sender: mpsc::Sender<LogTask>,
}

impl<'a> MakeWriter<'a> for FileWriter {
    type Writer = Writer<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        Writer {
            id: self.id,
            sender: &self.sender,
        }
    }
}

/// Writes log lines to files from a background task.
///
/// Files are opened in append mode and can be reopened after an external rotation.
pub struct LogWriter {
    id_acc: usize,
    sender: mpsc::Sender<LogTask>,
    handles: HashMap<PathBuf, File>,
}

impl LogWriter {
    pub fn new() -> anyhow::Result<(Self, JoinHandle<anyhow::Result<()>>)> {
        let (sender, mut tasks) = mpsc::channel::<LogTask>(128);
        let handle = tokio::spawn(async move {
            let mut files: HashMap<usize, (PathBuf, File)> = HashMap::new();
            while let Some(task) = tasks.recv().await {
                match task {
                    LogTask::Write(id, buf) => {
                        if let Some((_, file)) = files.get_mut(&id) {
                            if let Err(err) = file.write_all(&buf) {
                                eprintln!("Failed to write to log file: {}", err);
                            }
                        }
                    }
                    LogTask::Flush(id) => {
                        if let Some((_, file)) = files.get_mut(&id) {
                            if let Err(err) = file.flush() {
                                eprintln!("Failed to flush log file: {}", err);
                            }
                        }
                    }
                    LogTask::Reopen => {
                        for (path, file) in files.values_mut() {
                            match Self::open(path) {
                                Ok(reopened) => *file = reopened,
                                Err(err) => eprintln!("{err:?}"),
                            }
                        }
                    }
                    LogTask::AddFile(id, path, file) => {
                        files.insert(id, (path, file));
                    }
                    LogTask::Shutdown => break,
                }
            }
            for (_, file) in files.values_mut() {
                file.flush().ok();
            }
            Ok::<_, anyhow::Error>(())
        });
        Ok((
            Self {
                id_acc: 0,
                sender,
                handles: HashMap::new(),
            },
            handle,
        ))
    }

    fn open(path: &Path) -> anyhow::Result<File> {
        OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .with_context(|| format!("Failed to open log file '{path:?}'"))
    }

    pub fn create_file_writer(&mut self, path: impl AsRef<Path>) -> anyhow::Result<FileWriter> {
        let path = path.as_ref().to_path_buf();
        let file = match self.handles.get(&path) {
            Some(file) => file.try_clone()?,
            None => {
                let file = Self::open(&path)?;
                let cloned = file.try_clone()?;
                self.handles.insert(path.clone(), file);
                cloned
            }
        };
        self.id_acc += 1;
        self.sender
            .try_send(LogTask::AddFile(self.id_acc, path, file))
            .map_err(|_| send_failed())?;
        Ok(FileWriter {
            id: self.id_acc,
            sender: self.sender.clone(),
        })
    }

    /// Reopens every log file, used after logrotate moved them away
    pub fn reopen(&self) -> anyhow::Result<()> {
        self.sender
            .try_send(LogTask::Reopen)
            .map_err(|_| send_failed())?;
        Ok(())
    }

    pub fn shutdown(&self) {
        if self.sender.try_send(LogTask::Shutdown).is_err() {
            eprintln!("Failed to stop log writer");
        }
    }
}
