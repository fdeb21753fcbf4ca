use colored::Color;

pub const PRIMARY: Color = Color::BrightGreen;
pub const ACCENT: Color = Color::BrightYellow;
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;
pub const COMMAND: Color = Color::BrightCyan;
pub const STDERR: Color = Color::Red;
pub const OK: Color = Color::Green;
pub const PARTIAL: Color = Color::Yellow;
pub const FAILED: Color = Color::Red;
