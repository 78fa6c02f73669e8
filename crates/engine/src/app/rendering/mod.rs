mod background;
mod renderer;
mod transform;

pub use background::{load_background, BackgroundError, BackgroundImage};
pub use renderer::{Renderer, SceneView};
pub use transform::{natural_to_screen_px, rendered_to_screen_px, Viewport};
