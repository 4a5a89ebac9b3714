use embedded_graphics::{
    mono_font::{
        ascii::{FONT_10X20, FONT_8X13},
        MonoFont, MonoTextStyle,
    },
    pixelcolor::{Rgb565, Rgb888},
    prelude::*,
    primitives::{Circle, PrimitiveStyle, Rectangle, RoundedRectangle},
    text::{Alignment, Text},
};
use log::{debug, warn};

use crate::{config::ScreenConfig, types::Command};

const RING_THICKNESS: u32 = 10;
const RING_START: (u8, u8, u8) = (0x10, 0xff, 0xe0);
const BUTTON_WIDTH: u32 = 60;
const BUTTON_CORNER: u32 = 5;
const ERROR_COLUMNS: usize = 20;

/// Screens the sync core asks for. Drawing failures are the implementor's
/// concern; the core never retries a draw.
pub trait Display {
    fn show_setpoint(&mut self, setpoint: &str);
    fn show_error(&mut self, message: &str);
    fn show_status_code(&mut self, status: u16);
    fn show_button(&mut self, command: Command, pressed: bool);
}

/// Colour of the border ring `offset` pixels in from the outer edge.
pub fn ring_color(offset: u32) -> Rgb888 {
    let fade = 1.0 - offset.min(RING_THICKNESS) as f32 / RING_THICKNESS as f32;
    let (r, g, b) = RING_START;
    Rgb888::new(
        (f32::from(r) * fade) as u8,
        (f32::from(g) * fade) as u8,
        (f32::from(b) * fade) as u8,
    )
}

pub fn inactive_button_color() -> Rgb565 {
    Rgb888::new(0x10, 0x60, 0xe0).into()
}

/// Greedy word wrap; words longer than `columns` are left on their own line.
pub fn wrap_message(message: &str, columns: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in message.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > columns {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Round GC9A01-class panel drawn with embedded-graphics.
pub struct RoundPanel<D> {
    target: D,
    screen: ScreenConfig,
}

impl<D> RoundPanel<D>
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: core::fmt::Debug,
{
    pub fn new(target: D, screen: ScreenConfig) -> Self {
        Self { target, screen }
    }

    pub fn target(&self) -> &D {
        &self.target
    }

    fn center(&self) -> Point {
        Point::new(
            i32::from(self.screen.width) / 2,
            i32::from(self.screen.height) / 2,
        )
    }

    fn zone_height(&self) -> u32 {
        u32::from(self.screen.height) / 4
    }

    fn button_origin(&self, command: Command) -> Point {
        let x = i32::from(self.screen.width) / 2 - BUTTON_WIDTH as i32 / 2;
        let y = match command {
            Command::Increase => 0,
            Command::Decrease => 3 * self.zone_height() as i32,
        };
        Point::new(x, y)
    }

    fn glyph_anchor(&self, command: Command) -> Point {
        let origin = self.button_origin(command);
        Point::new(self.center().x, origin.y + self.zone_height() as i32 / 2 + 7)
    }

    fn clear_with_border(&mut self) -> Result<(), D::Error> {
        self.target.clear(Rgb565::BLACK)?;

        let outer = u32::from(self.screen.width.min(self.screen.height)) / 2;
        for offset in 0..RING_THICKNESS.min(outer) {
            let radius = outer - offset;
            let color: Rgb565 = ring_color(offset).into();
            Circle::with_center(self.center(), 2 * radius + 1)
                .into_styled(PrimitiveStyle::with_stroke(color, 1))
                .draw(&mut self.target)?;
        }
        Ok(())
    }

    fn text(
        &mut self,
        text: &str,
        at: Point,
        font: &MonoFont<'_>,
        color: Rgb565,
    ) -> Result<(), D::Error> {
        Text::with_alignment(text, at, MonoTextStyle::new(font, color), Alignment::Center)
            .draw(&mut self.target)?;
        Ok(())
    }

    fn draw_setpoint(&mut self, setpoint: &str) -> Result<(), D::Error> {
        self.clear_with_border()?;
        for command in [Command::Increase, Command::Decrease] {
            let anchor = self.glyph_anchor(command);
            self.text(command.glyph(), anchor, &FONT_10X20, Rgb565::WHITE)?;
        }

        let center = self.center();
        self.text("Temp Set:", center - Point::new(0, 10), &FONT_10X20, Rgb565::WHITE)?;
        self.text(
            &format!("{setpoint} F"),
            center + Point::new(0, 30),
            &FONT_10X20,
            Rgb565::WHITE,
        )
    }

    fn draw_error(&mut self, message: &str) -> Result<(), D::Error> {
        self.clear_with_border()?;
        let lines = wrap_message(message, ERROR_COLUMNS);
        let line_height = FONT_8X13.character_size.height as i32 + 2;
        let top = self.center().y - (lines.len() as i32 * line_height) / 2 + line_height / 2;
        for (index, line) in lines.iter().enumerate() {
            let at = Point::new(self.center().x, top + index as i32 * line_height);
            self.text(line, at, &FONT_8X13, Rgb565::WHITE)?;
        }
        Ok(())
    }

    fn draw_status_code(&mut self, status: u16) -> Result<(), D::Error> {
        self.clear_with_border()?;
        let center = self.center();
        self.text(&status.to_string(), center, &FONT_10X20, Rgb565::WHITE)
    }

    fn draw_button(&mut self, command: Command, pressed: bool) -> Result<(), D::Error> {
        let fill = if pressed {
            Rgb565::WHITE
        } else {
            inactive_button_color()
        };
        let area = Rectangle::new(
            self.button_origin(command),
            Size::new(BUTTON_WIDTH, self.zone_height()),
        );
        RoundedRectangle::with_equal_corners(area, Size::new(BUTTON_CORNER, BUTTON_CORNER))
            .into_styled(PrimitiveStyle::with_fill(fill))
            .draw(&mut self.target)?;

        let anchor = self.glyph_anchor(command);
        self.text(command.glyph(), anchor, &FONT_10X20, Rgb565::BLACK)
    }
}

impl<D> Display for RoundPanel<D>
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: core::fmt::Debug,
{
    fn show_setpoint(&mut self, setpoint: &str) {
        debug!("render setpoint {setpoint:?}");
        if let Err(err) = self.draw_setpoint(setpoint) {
            warn!("setpoint draw failed: {err:?}");
        }
    }

    fn show_error(&mut self, message: &str) {
        debug!("render error {message:?}");
        if let Err(err) = self.draw_error(message) {
            warn!("error screen draw failed: {err:?}");
        }
    }

    fn show_status_code(&mut self, status: u16) {
        debug!("render status {status}");
        if let Err(err) = self.draw_status_code(status) {
            warn!("status draw failed: {err:?}");
        }
    }

    fn show_button(&mut self, command: Command, pressed: bool) {
        if let Err(err) = self.draw_button(command, pressed) {
            warn!("{} button draw failed: {err:?}", command.as_str());
        }
    }
}

/// In-memory RGB565 surface, used by the host build and tests.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Rgb565>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgb565::BLACK; (width * height) as usize],
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb565> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    pub fn count(&self, color: Rgb565) -> usize {
        self.pixels.iter().filter(|pixel| **pixel == color).count()
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = Rgb565;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) else {
                continue;
            };
            if x < self.width && y < self.height {
                self.pixels[(y * self.width + x) as usize] = color;
            }
        }
        Ok(())
    }
}
