//! Raster previews of map fragments.
//!
//! The preview is a plain RGBA8 canvas, one `tile_px` square per tile of
//! the z = 1 slice. Sprite lookup is behind the [`SpriteSource`] trait so
//! the engine never touches icon files itself; a source that returns `None`
//! for everything yields a blank (but correctly sized) canvas.

use crate::model::{Coord, MapFragment, unquote_text};

/// Facing used when a prefab has no `dir` variable.
pub const DEFAULT_DIR: i32 = 2;

/// One sprite's pixels, row-major, top row first.
#[derive(Debug, Clone)]
pub struct Sprite {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<[u8; 4]>,
}

/// Supplies sprites for preview rendering.
pub trait SpriteSource {
    /// Edge length of one tile, in pixels.
    fn tile_px(&self) -> usize;

    /// Sprite for an icon/state/direction triple. `None` paints nothing;
    /// placeholder art is the source's business, not the renderer's.
    fn sprite(&self, icon: &str, icon_state: &str, dir: i32) -> Option<Sprite>;
}

/// RGBA8 canvas, row-major, row 0 at the top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<[u8; 4]>,
}

impl PreviewImage {
    fn blank(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0; 4]; width * height],
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        self.pixels[y * self.width + x]
    }
}

/// Paint the z = 1 slice of `fragment` onto a fresh canvas. Stacks paint
/// bottom to top, so later instances cover earlier ones. Map y grows
/// upward while canvas rows grow downward, so tile row y = height lands on
/// canvas row 0.
pub fn render_preview(fragment: &MapFragment, sprites: &dyn SpriteSource) -> PreviewImage {
    let tile_px = sprites.tile_px();
    let size = fragment.size;
    let mut image = PreviewImage::blank(
        size.width as usize * tile_px,
        size.height as usize * tile_px,
    );

    for y in 1..=size.height {
        for x in 1..=size.width {
            let origin_x = (x - 1) as usize * tile_px;
            let origin_y = (size.height - y) as usize * tile_px;
            for prefab in fragment.prefabs_at(Coord::new(x, y, 1)) {
                let vars = prefab.vars();
                let icon = vars.get("icon").map(unquote_text).unwrap_or_default();
                let icon_state = vars.get("icon_state").map(unquote_text).unwrap_or_default();
                let dir = vars
                    .get("dir")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_DIR);
                let Some(sprite) = sprites.sprite(&icon, &icon_state, dir) else {
                    continue;
                };
                blit(&mut image, origin_x, origin_y, &sprite);
            }
        }
    }
    image
}

/// Copy `sprite` onto the canvas at the given origin, clipping at the
/// canvas edges.
fn blit(image: &mut PreviewImage, origin_x: usize, origin_y: usize, sprite: &Sprite) {
    for sy in 0..sprite.height {
        let dy = origin_y + sy;
        if dy >= image.height {
            break;
        }
        for sx in 0..sprite.width {
            let dx = origin_x + sx;
            if dx >= image.width {
                break;
            }
            let src = sprite.pixels[sy * sprite.width + sx];
            let dst = &mut image.pixels[dy * image.width + dx];
            blend_over(dst, src);
        }
    }
}

/// Straight-alpha "source over destination".
fn blend_over(dst: &mut [u8; 4], src: [u8; 4]) {
    let src_a = src[3] as f32 / 255.0;
    if src_a <= 0.0 {
        return;
    }
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        *dst = [0; 4];
        return;
    }
    for channel in 0..3 {
        let src_c = src[channel] as f32 / 255.0;
        let dst_c = dst[channel] as f32 / 255.0;
        let out = (src_c * src_a + dst_c * dst_a * (1.0 - src_a)) / out_a;
        dst[channel] = (out * 255.0).round() as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}
