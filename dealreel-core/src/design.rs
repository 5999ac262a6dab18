use std::path::PathBuf;

use crate::config::{DesignSection, VideoSection};
use crate::deal::Deal;
use crate::filter::{AlphaRamp, Color, DrawText, FadeDirection, Filter, FilterChain, XPos};

const TITLE_MAX_CHARS: usize = 60;

const INTRO_TITLE_Y: u32 = 760;
const INTRO_SUBTITLE_Y: u32 = 860;
const INTRO_SUBTITLE_DELAY: f64 = 0.2;
const OUTRO_TITLE_Y: u32 = 790;
const OUTRO_URL_Y: u32 = 900;
const OUTRO_URL_DELAY: f64 = 0.25;

const OVERLAY_BOX_X: u32 = 35;
const OVERLAY_BOX_W: u32 = 1010;
const OVERLAY_TEXT_X: u32 = 60;

/// Branding for the daily short: where text goes, when it appears, how it looks.
#[derive(Debug, Clone)]
pub struct ShortsDesign {
    design: DesignSection,
    video: VideoSection,
    font: PathBuf,
}

impl ShortsDesign {
    pub fn new(design: DesignSection, video: VideoSection, font: impl Into<PathBuf>) -> Self {
        Self {
            design,
            video,
            font: font.into(),
        }
    }

    pub fn video(&self) -> &VideoSection {
        &self.video
    }

    fn ramp(&self, total: f64, delay: f64) -> AlphaRamp {
        AlphaRamp::new(
            total,
            delay,
            self.design.text_fade_in_seconds,
            self.design.text_fade_out_seconds,
        )
    }

    fn text(&self, text: impl Into<String>) -> DrawText {
        DrawText::new(self.font.clone(), text)
    }

    pub fn intro_title(&self, date_label: &str) -> String {
        self.design.intro_title_template.replace("{date}", date_label)
    }

    pub fn intro_chain(&self, date_label: &str, duration: f64) -> FilterChain {
        FilterChain::new()
            .then(Filter::DrawText(
                self.text(self.intro_title(date_label))
                    .at(XPos::Center, INTRO_TITLE_Y)
                    .size(62)
                    .color(Color::named("white"))
                    .alpha(self.ramp(duration, 0.0)),
            ))
            .then(Filter::DrawText(
                self.text(self.design.intro_subtitle.clone())
                    .at(XPos::Center, INTRO_SUBTITLE_Y)
                    .size(46)
                    .color(Color::named("yellow"))
                    .alpha(self.ramp(duration, INTRO_SUBTITLE_DELAY)),
            ))
    }

    pub fn outro_chain(&self, duration: f64) -> FilterChain {
        FilterChain::new()
            .then(Filter::DrawText(
                self.text(self.design.outro_title.clone())
                    .at(XPos::Center, OUTRO_TITLE_Y)
                    .size(60)
                    .color(Color::named("white"))
                    .alpha(self.ramp(duration, 0.0)),
            ))
            .then(Filter::DrawText(
                self.text(self.design.cta_url.clone())
                    .at(XPos::Center, OUTRO_URL_Y)
                    .size(42)
                    .color(Color::named("cyan"))
                    .alpha(self.ramp(duration, OUTRO_URL_DELAY)),
            ))
    }

    /// Trailer frame normalization, deal overlay and fade-to-black edges.
    pub fn game_chain(&self, deal: &Deal, duration: f64) -> FilterChain {
        let title: String = deal.name.chars().take(TITLE_MAX_CHARS).collect();
        let design = &self.design;
        let mut chain = FilterChain::new()
            .then(Filter::ScaleCover {
                width: self.video.width,
                height: self.video.height,
            })
            .then(Filter::Crop {
                width: self.video.width,
                height: self.video.height,
            })
            .then(Filter::Fps(self.video.fps))
            .then(Filter::ResetTimestamps)
            .then(Filter::Format(self.video.pix_fmt.clone()))
            .then(Filter::DrawBox {
                x: OVERLAY_BOX_X,
                y: design.overlay_box_y,
                width: OVERLAY_BOX_W,
                height: design.overlay_box_h,
                color: Color::translucent("black", 0.45),
            })
            .then(Filter::DrawText(
                self.text(title)
                    .at(XPos::Px(OVERLAY_TEXT_X), design.overlay_title_y)
                    .size(50)
                    .color(Color::named("white"))
                    .alpha(self.ramp(duration, design.title_delay_seconds))
                    .literal(),
            ))
            .then(Filter::DrawText(
                self.text(deal.discount_label())
                    .at(XPos::Px(OVERLAY_TEXT_X), design.overlay_discount_y)
                    .size(78)
                    .color(Color::named("yellow"))
                    .alpha(self.ramp(duration, design.discount_delay_seconds))
                    .literal(),
            ))
            .then(Filter::DrawText(
                self.text(format!("Old: {}", deal.original_price_label()))
                    .at(XPos::Px(OVERLAY_TEXT_X), design.overlay_old_price_y)
                    .size(40)
                    .color(Color::named("white"))
                    .alpha(self.ramp(duration, design.old_price_delay_seconds))
                    .literal(),
            ))
            .then(Filter::DrawText(
                self.text(format!("Now: {}", deal.final_price_label()))
                    .at(XPos::Px(OVERLAY_TEXT_X), design.overlay_new_price_y)
                    .size(48)
                    .color(Color::named("lime"))
                    .alpha(self.ramp(duration, design.new_price_delay_seconds))
                    .literal(),
            ));
        if design.segment_fade_in_seconds > 0.0 {
            chain.push(Filter::Fade {
                direction: FadeDirection::In,
                start: 0.0,
                duration: design.segment_fade_in_seconds,
            });
        }
        if design.segment_fade_out_seconds > 0.0 {
            chain.push(Filter::Fade {
                direction: FadeDirection::Out,
                start: (duration - design.segment_fade_out_seconds).max(0.0),
                duration: design.segment_fade_out_seconds,
            });
        }
        chain
    }
}
