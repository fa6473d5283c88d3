use std::io::Write;

pub const HIDE_CURSOR: &str = "\x1B[?25l";
pub const SHOW_CURSOR: &str = "\x1B[?25h";
pub const CLEAR_SCREEN: &str = "\x1Bc";
pub const ERASE_PREVIOUS_LINE: &str = "\x1B[1A\x1B[K";
pub const CURSOR_HOME: &str = "\x1B[H";

/// A write held back until the next frame is drawn.
pub type DeferredWrite = Box<dyn FnOnce(&mut dyn Write) -> std::io::Result<()> + Send>;

/// Line-buffered writer over the out and err streams.
///
/// Text destined for the live frame is collected with [`Console::log`] or
/// `write!` and only reaches the stream on [`Console::flush_buffered_output`],
/// which also records how many rows were drawn so the next frame can erase
/// exactly those rows.
///
/// ```rust,ignore
/// use std::fmt::Write;
///
/// writeln!(console, "{} {}", symbol, task.title())?;
/// console.flush_buffered_output()?;
/// // ... later
/// console.clear_lines_output()?;
/// ```
pub struct Console {
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
    silent: bool,
    buffered_output: String,
    buffered_streams: Vec<DeferredWrite>,
    last_output_height: usize,
}

impl Console {
    pub fn new(out: impl Write + Send + 'static, err: impl Write + Send + 'static) -> Self {
        Self {
            out: Box::new(out),
            err: Box::new(err),
            silent: false,
            buffered_output: String::new(),
            buffered_streams: Vec::new(),
            last_output_height: 0,
        }
    }

    /// Console over the process stdout and stderr.
    pub fn stdio() -> Self {
        Self::new(std::io::stdout(), std::io::stderr())
    }

    /// Suppress every write. Buffers are still drained.
    pub fn silent(mut self, yes: bool) -> Self {
        self.silent = yes;
        self
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    pub fn out(&mut self, text: &str) -> std::io::Result<()> {
        if self.silent || text.is_empty() {
            return Ok(());
        }
        self.out.write_all(text.as_bytes())?;
        self.out.flush()
    }

    pub fn err(&mut self, text: &str) -> std::io::Result<()> {
        if self.silent || text.is_empty() {
            return Ok(());
        }
        self.err.write_all(text.as_bytes())?;
        self.err.flush()
    }

    pub fn hide_cursor(&mut self) -> std::io::Result<()> {
        self.out(HIDE_CURSOR)
    }

    pub fn show_cursor(&mut self) -> std::io::Result<()> {
        self.out(SHOW_CURSOR)
    }

    pub fn reset_cursor(&mut self) -> std::io::Result<()> {
        self.out(CURSOR_HOME)
    }

    /// Wipes the whole screen.
    pub fn clear_output(&mut self) -> std::io::Result<()> {
        self.out(CLEAR_SCREEN)?;
        self.last_output_height = 0;
        Ok(())
    }

    /// Erases only the rows drawn by the previous flush.
    pub fn clear_lines_output(&mut self) -> std::io::Result<()> {
        let lines_drawn = self.last_output_height;
        if lines_drawn > 0 {
            self.out(&ERASE_PREVIOUS_LINE.repeat(lines_drawn))?;
        }
        self.last_output_height = 0;
        Ok(())
    }

    /// Appends `text` and `newlines` line feeds to the pending frame.
    pub fn log(&mut self, text: &str, newlines: usize) {
        self.buffered_output.push_str(text);
        for _ in 0..newlines {
            self.buffered_output.push('\n');
        }
    }

    /// Queues a raw write to run at the next [`Console::flush_buffered_streams`].
    pub fn defer<F>(&mut self, write: F)
    where
        F: FnOnce(&mut dyn Write) -> std::io::Result<()> + Send + 'static,
    {
        self.buffered_streams.push(Box::new(write));
    }

    pub fn flush_buffered_output(&mut self) -> std::io::Result<()> {
        if self.buffered_output.is_empty() {
            return Ok(());
        }
        let output = std::mem::take(&mut self.buffered_output);
        if self.silent {
            return Ok(());
        }
        self.out(&output)?;
        self.last_output_height = output.matches('\n').count();
        Ok(())
    }

    pub fn flush_buffered_streams(&mut self) -> std::io::Result<()> {
        let queued = std::mem::take(&mut self.buffered_streams);
        if queued.is_empty() {
            return Ok(());
        }
        for write in queued {
            if self.silent {
                continue;
            }
            write(&mut *self.out)?;
        }
        self.out.flush()
    }

    pub fn buffered_output(&self) -> &str {
        &self.buffered_output
    }

    pub fn pending_streams(&self) -> usize {
        self.buffered_streams.len()
    }

    pub fn last_output_height(&self) -> usize {
        self.last_output_height
    }

    /// Forgets the rows of the last frame so they are never erased.
    pub(crate) fn commit_output(&mut self) {
        self.last_output_height = 0;
    }
}

impl std::fmt::Write for Console {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.buffered_output.push_str(s);
        Ok(())
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("silent", &self.silent)
            .field("buffered_output", &self.buffered_output)
            .field("buffered_streams", &self.buffered_streams.len())
            .field("last_output_height", &self.last_output_height)
            .finish()
    }
}
