//! Typed transcoder filter descriptions.
//!
//! Layout and timing live in plain values ([`AlphaRamp`], [`DrawText`], ...) so they
//! can be inspected and tested directly; `render()` is the only place that knows
//! the ffmpeg filter syntax.

use std::fmt::Write as _;
use std::path::PathBuf;

const MIN_FADE_SECONDS: f64 = 0.01;

/// Formats seconds/pixels compactly: `0.35`, `2.5`, `0`.
pub fn fmt_num(value: f64) -> String {
    let mut out = format!("{value:.3}");
    while out.ends_with('0') {
        out.pop();
    }
    if out.ends_with('.') {
        out.pop();
    }
    if out == "-0" {
        out = "0".to_string();
    }
    out
}

/// Escapes text for the inside of a single-quoted drawtext `text=` value.
///
/// Two parsers see the value: the filter graph strips the quotes, then the
/// option parser unescapes. A `'` is escaped for the option parser and then
/// spliced out of the graph quotes as `'\''`. `%` only matters when expansion
/// is enabled.
pub fn escape_drawtext(text: &str, expansion: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ':' => out.push_str("\\:"),
            '\'' => out.push_str("\\'\\''"),
            ',' => out.push_str("\\,"),
            '%' if expansion => out.push_str("%%"),
            other => out.push(other),
        }
    }
    out
}

fn escape_option_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace(':', "\\:")
}

/// Opacity curve: hidden until `delay`, linear fade in, hold, linear fade out
/// finishing at `total`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlphaRamp {
    pub delay: f64,
    pub fade_in: f64,
    pub fade_out: f64,
    pub total: f64,
}

impl AlphaRamp {
    pub fn new(total: f64, delay: f64, fade_in: f64, fade_out: f64) -> Self {
        Self {
            delay,
            fade_in: fade_in.max(MIN_FADE_SECONDS),
            fade_out: fade_out.max(MIN_FADE_SECONDS),
            total,
        }
    }

    pub fn fade_out_start(&self) -> f64 {
        (self.total - self.fade_out).max(self.delay + self.fade_in)
    }

    pub fn value_at(&self, t: f64) -> f64 {
        if t < self.delay {
            0.0
        } else if t < self.delay + self.fade_in {
            (t - self.delay) / self.fade_in
        } else if t < self.fade_out_start() {
            1.0
        } else {
            ((self.total - t) / self.fade_out).max(0.0)
        }
    }

    /// Same curve as [`AlphaRamp::value_at`], as an ffmpeg expression.
    pub fn render(&self) -> String {
        let delay = fmt_num(self.delay);
        let ramp_end = fmt_num(self.delay + self.fade_in);
        let fade_in = fmt_num(self.fade_in);
        let out_start = fmt_num(self.fade_out_start());
        let total = fmt_num(self.total);
        let fade_out = fmt_num(self.fade_out);
        format!(
            "if(lt(t\\,{delay})\\,0\\,if(lt(t\\,{ramp_end})\\,(t-{delay})/{fade_in}\\,\
             if(lt(t\\,{out_start})\\,1\\,max(0\\,({total}-t)/{fade_out}))))"
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Color {
    pub name: String,
    pub opacity: Option<f64>,
}

impl Color {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            opacity: None,
        }
    }

    pub fn translucent(name: impl Into<String>, opacity: f64) -> Self {
        Self {
            name: name.into(),
            opacity: Some(opacity.clamp(0.0, 1.0)),
        }
    }

    fn render(&self) -> String {
        match self.opacity {
            Some(opacity) => format!("{}@{}", self.name, fmt_num(opacity)),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum XPos {
    Center,
    Px(u32),
}

impl XPos {
    fn render(&self) -> String {
        match self {
            XPos::Center => "(w-text_w)/2".to_string(),
            XPos::Px(px) => px.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawText {
    pub font: PathBuf,
    pub text: String,
    pub x: XPos,
    pub y: u32,
    pub size: u32,
    pub color: Color,
    pub alpha: Option<AlphaRamp>,
    /// Disables `%{...}` expansion so prices and percentages render verbatim.
    pub literal: bool,
}

impl DrawText {
    pub fn new(font: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            font: font.into(),
            text: text.into(),
            x: XPos::Center,
            y: 0,
            size: 48,
            color: Color::named("white"),
            alpha: None,
            literal: false,
        }
    }

    pub fn at(mut self, x: XPos, y: u32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn alpha(mut self, ramp: AlphaRamp) -> Self {
        self.alpha = Some(ramp);
        self
    }

    pub fn literal(mut self) -> Self {
        self.literal = true;
        self
    }

    fn render(&self) -> String {
        let mut out = format!(
            "drawtext=fontfile={}",
            escape_option_value(&self.font.to_string_lossy())
        );
        if self.literal {
            out.push_str(":expansion=none");
        }
        let _ = write!(
            out,
            ":text='{}':x={}:y={}:fontsize={}:fontcolor={}",
            escape_drawtext(&self.text, !self.literal),
            self.x.render(),
            self.y,
            self.size,
            self.color.render()
        );
        if let Some(ramp) = &self.alpha {
            let _ = write!(out, ":alpha='{}'", ramp.render());
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    In,
    Out,
}

impl FadeDirection {
    fn as_str(&self) -> &'static str {
        match self {
            FadeDirection::In => "in",
            FadeDirection::Out => "out",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Scale so the frame covers `width`x`height`, keeping aspect ratio.
    ScaleCover { width: u32, height: u32 },
    Crop { width: u32, height: u32 },
    Fps(u32),
    ResetTimestamps,
    TimeBase,
    Format(String),
    DrawBox {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        color: Color,
    },
    DrawText(DrawText),
    Fade {
        direction: FadeDirection,
        start: f64,
        duration: f64,
    },
    Crossfade { duration: f64, offset: f64 },
    AudioTrim { duration: f64 },
    AudioResetTimestamps,
    AudioFade {
        direction: FadeDirection,
        start: f64,
        duration: f64,
    },
}

impl Filter {
    pub fn render(&self) -> String {
        match self {
            Filter::ScaleCover { width, height } => {
                format!("scale={width}:{height}:force_original_aspect_ratio=increase")
            }
            Filter::Crop { width, height } => format!("crop={width}:{height}"),
            Filter::Fps(fps) => format!("fps={fps}"),
            Filter::ResetTimestamps => "setpts=PTS-STARTPTS".to_string(),
            Filter::TimeBase => "settb=AVTB".to_string(),
            Filter::Format(pix_fmt) => format!("format={pix_fmt}"),
            Filter::DrawBox {
                x,
                y,
                width,
                height,
                color,
            } => format!(
                "drawbox=x={x}:y={y}:w={width}:h={height}:color={}:t=fill",
                color.render()
            ),
            Filter::DrawText(text) => text.render(),
            Filter::Fade {
                direction,
                start,
                duration,
            } => format!(
                "fade=t={}:st={}:d={}",
                direction.as_str(),
                fmt_num(*start),
                fmt_num(*duration)
            ),
            Filter::Crossfade { duration, offset } => format!(
                "xfade=transition=fade:duration={duration:.3}:offset={offset:.3}"
            ),
            Filter::AudioTrim { duration } => format!("atrim=duration={duration:.3}"),
            Filter::AudioResetTimestamps => "asetpts=PTS-STARTPTS".to_string(),
            Filter::AudioFade {
                direction,
                start,
                duration,
            } => format!(
                "afade=t={}:st={:.3}:d={}",
                direction.as_str(),
                start,
                fmt_num(*duration)
            ),
        }
    }
}

/// Linear filter chain, rendered as `a,b,c`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterChain {
    filters: Vec<Filter>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: Filter) -> &mut Self {
        self.filters.push(filter);
        self
    }

    pub fn then(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn render(&self) -> String {
        self.filters
            .iter()
            .map(Filter::render)
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub inputs: Vec<String>,
    pub chain: FilterChain,
    pub output: String,
}

/// Labeled filter graph, rendered as `[in]chain[out];...`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterGraph {
    nodes: Vec<GraphNode>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node<I, S>(&mut self, inputs: I, chain: FilterChain, output: impl Into<String>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nodes.push(GraphNode {
            inputs: inputs.into_iter().map(Into::into).collect(),
            chain,
            output: output.into(),
        });
    }

    pub fn render(&self) -> String {
        self.nodes
            .iter()
            .map(|node| {
                let mut out = String::new();
                for input in &node.inputs {
                    let _ = write!(out, "[{input}]");
                }
                out.push_str(&node.chain.render());
                let _ = write!(out, "[{}]", node.output);
                out
            })
            .collect::<Vec<_>>()
            .join(";")
    }
}
