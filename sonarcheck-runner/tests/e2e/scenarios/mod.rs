mod import;
mod language;
mod lifecycle;
mod readiness;
mod tool;
