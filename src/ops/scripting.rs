// ============================================================================
// RasterFE Scripting: line-oriented command language
// ============================================================================
//
// One command per line:
//
//   load full <manifest>          create layer <name>       current <name>
//   load <file>                   save full <reference>     save <file>
//   filter <blur|sharpen>         transformation <monochrome|sepia>
//   adjustment downscale <w>&<h>  adjustment mosaic <seeds>
//   visible                       invisible                 exit
//
// Blank lines and `#` comments are ignored.  A failing command is reported
// and the run carries on with the next line.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::canvas::LayerStack;
use crate::error::{EditorError, EditorResult};
use crate::io::{self, FileType};
use crate::ops::adjustments::TransformKind;
use crate::ops::filters::FilterKind;
use crate::project;

/// Printed at the start of interactive text mode.
pub const COMMAND_SUMMARY: &str = "Only one command per line:\n\
    load full [filename] // create layer [name] // current [name] // load [filename] // save [filename]\n\
    save full [filename] // filter [filtertype] // transformation [transformationtype] // \
    adjustment downscale [width]&[height]\n\
    adjustment mosaic [seed] // visible // invisible // exit";

// ============================================================================
// Commands
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    LoadProject(PathBuf),
    CreateLayer(String),
    Current(String),
    Load(PathBuf),
    SaveProject(String),
    Save(PathBuf),
    Filter(FilterKind),
    Transformation(TransformKind),
    Downscale { width: u32, height: u32 },
    Mosaic(usize),
    Visible,
    Invisible,
    Exit,
}

impl Command {
    /// Parse one non-blank, non-comment line.
    pub fn parse(line: &str) -> EditorResult<Command> {
        let line = line.trim();

        if let Some(rest) = strip_keyword(line, "load full") {
            return Ok(Command::LoadProject(PathBuf::from(required(rest, "load full")?)));
        }
        if let Some(rest) = strip_keyword(line, "create layer") {
            return Ok(Command::CreateLayer(required(rest, "create layer")?.to_string()));
        }
        if let Some(rest) = strip_keyword(line, "current") {
            return Ok(Command::Current(required(rest, "current")?.to_string()));
        }
        if let Some(rest) = strip_keyword(line, "load") {
            return Ok(Command::Load(PathBuf::from(required(rest, "load")?)));
        }
        if let Some(rest) = strip_keyword(line, "save full") {
            return Ok(Command::SaveProject(required(rest, "save full")?.to_string()));
        }
        if let Some(rest) = strip_keyword(line, "save") {
            return Ok(Command::Save(PathBuf::from(required(rest, "save")?)));
        }
        if let Some(rest) = strip_keyword(line, "filter") {
            return Ok(Command::Filter(required(rest, "filter")?.parse()?));
        }
        if let Some(rest) = strip_keyword(line, "transformation") {
            return Ok(Command::Transformation(required(rest, "transformation")?.parse()?));
        }
        if let Some(rest) = strip_keyword(line, "adjustment downscale") {
            let (w, h) = required(rest, "adjustment downscale")?
                .split_once('&')
                .ok_or_else(|| EditorError::invalid("downscale expects [width]&[height]"))?;
            return Ok(Command::Downscale {
                width: parse_count(w, "downscale width")?,
                height: parse_count(h, "downscale height")?,
            });
        }
        if let Some(rest) = strip_keyword(line, "adjustment mosaic") {
            let seeds = parse_count(required(rest, "adjustment mosaic")?, "mosaic seed count")?;
            return Ok(Command::Mosaic(seeds as usize));
        }
        match line {
            "visible" => Ok(Command::Visible),
            "invisible" => Ok(Command::Invisible),
            "exit" => Ok(Command::Exit),
            _ => Err(EditorError::invalid(format!("Unknown command {}", line))),
        }
    }
}

/// `keyword` followed by end-of-line or whitespace.
fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(keyword)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

fn required<'a>(arg: &'a str, command: &str) -> EditorResult<&'a str> {
    if arg.is_empty() {
        Err(EditorError::invalid(format!("'{}' needs an argument", command)))
    } else {
        Ok(arg)
    }
}

/// Strictly positive integer argument.
fn parse_count(s: &str, what: &str) -> EditorResult<u32> {
    let s = s.trim();
    let v: i64 = s
        .parse()
        .map_err(|_| EditorError::invalid(format!("{} must be an integer, got '{}'", what, s)))?;
    if v <= 0 || v > u32::MAX as i64 {
        return Err(EditorError::invalid(format!("{} must be positive, got {}", what, v)));
    }
    Ok(v as u32)
}

// ============================================================================
// Error type
// ============================================================================

/// A command that failed, with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    pub message: String,
    pub line: usize,
}

impl ScriptError {
    fn at(line: usize, err: &EditorError) -> Self {
        Self {
            message: err.to_string(),
            line,
        }
    }
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Line {}: {}", self.line, self.message)
    }
}

/// Outcome of running a whole script.
#[derive(Debug, Default)]
pub struct ScriptReport {
    pub commands_run: usize,
    pub errors: Vec<ScriptError>,
    pub exited: bool,
}

impl ScriptReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

// ============================================================================
// Session
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Everything a script needs between commands: the stack it edits, the
/// directory relative paths resolve against, and the mosaic RNG.
pub struct ScriptSession {
    stack: LayerStack,
    workdir: PathBuf,
    rng: StdRng,
}

impl ScriptSession {
    pub fn new(workdir: impl Into<PathBuf>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            stack: LayerStack::new(),
            workdir: workdir.into(),
            rng,
        }
    }

    pub fn stack(&self) -> &LayerStack { &self.stack }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workdir.join(path)
        }
    }

    pub fn execute(&mut self, command: Command) -> EditorResult<Flow> {
        match command {
            Command::LoadProject(path) => {
                self.stack = project::load_layered_project(&self.resolve(&path))?;
            }
            Command::CreateLayer(name) => self.stack.new_layer(&name)?,
            Command::Current(name) => self.stack.set_current(&name)?,
            Command::Load(path) => {
                let image = io::load_image_sync(&self.resolve(&path))?;
                self.stack.load_to_current(image)?;
            }
            Command::SaveProject(reference) => {
                project::export_full_project(&self.stack, &self.workdir, &reference)?;
            }
            Command::Save(path) => {
                let kind = FileType::from_path(&path)?;
                let bytes = self.stack.export_current(kind)?;
                io::write_bytes(&self.resolve(&path), &bytes)?;
                log::info!("saved current layer to {}", path.display());
            }
            Command::Filter(kind) => self.stack.apply_filter(kind)?,
            Command::Transformation(kind) => self.stack.apply_transformation(kind)?,
            Command::Downscale { width, height } => self.stack.apply_downscale(width, height)?,
            Command::Mosaic(seeds) => self.stack.apply_mosaic_with(seeds, &mut self.rng)?,
            Command::Visible => self.stack.set_visible()?,
            Command::Invisible => self.stack.set_invisible()?,
            Command::Exit => return Ok(Flow::Exit),
        }
        Ok(Flow::Continue)
    }

    /// Run every line of `input`, writing failures to `output`.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> EditorResult<ScriptReport> {
        let mut report = ScriptReport::default();

        for (idx, line) in input.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let result = Command::parse(trimmed).and_then(|cmd| self.execute(cmd));
            report.commands_run += 1;
            match result {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => {
                    report.exited = true;
                    break;
                }
                Err(e) => {
                    log::warn!("line {}: '{}' failed: {}", line_no, trimmed, e);
                    writeln!(output, "{}", e)?;
                    report.errors.push(ScriptError::at(line_no, &e));
                }
            }
        }

        output.flush()?;
        Ok(report)
    }
}
