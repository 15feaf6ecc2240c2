use super::HalfblockCell;

/// Map the supersampled framebuffer onto terminal cells: each cell shows two
/// vertically stacked pixels via the lower-half-block glyph (background =
/// top pixel, foreground = bottom pixel).
pub fn build_halfblock_cells(
    fb: &[[u8; 3]],
    ss_width: usize,
    ss_height: usize,
    term_cols: usize,
    term_rows: usize,
    ss: usize,
    out: &mut Vec<HalfblockCell>,
) {
    if ss == 1 {
        // Fast path: 1x supersampling -- directly map pairs of pixel rows.
        out.clear();
        out.resize(term_cols * term_rows, ([0u8; 3], [0u8; 3]));
        for term_row in 0..term_rows {
            let top_y = term_row * 2;
            let bot_y = top_y + 1;
            for x in 0..term_cols {
                let top = fb[top_y * ss_width + x];
                let bot = if bot_y < ss_height {
                    fb[bot_y * ss_width + x]
                } else {
                    [0, 0, 0]
                };
                out[term_row * term_cols + x] = (top, bot);
            }
        }
    } else {
        downsample_to_terminal(fb, ss_width, ss_height, term_cols, term_rows, ss, out);
    }
}

/// Box-filter each cell's two pixel windows down to a single color pair.
fn downsample_to_terminal(
    fb: &[[u8; 3]],
    ss_width: usize,
    ss_height: usize,
    term_cols: usize,
    term_rows: usize,
    ss: usize,
    out: &mut Vec<HalfblockCell>,
) {
    out.clear();
    out.resize(term_cols * term_rows, ([0u8; 3], [0u8; 3]));

    for term_row in 0..term_rows {
        for term_col in 0..term_cols {
            let x0 = term_col * ss;
            let x1 = ((term_col + 1) * ss).min(ss_width);
            let top_y0 = term_row * 2 * ss;
            let top_y1 = (term_row * 2 * ss + ss).min(ss_height);
            let bot_y0 = (term_row * 2 * ss + ss).min(ss_height);
            let bot_y1 = ((term_row + 1) * 2 * ss).min(ss_height);

            let top = average_window(fb, ss_width, x0, x1, top_y0, top_y1);
            let bot = average_window(fb, ss_width, x0, x1, bot_y0, bot_y1);
            out[term_row * term_cols + term_col] = (top, bot);
        }
    }
}

fn average_window(
    fb: &[[u8; 3]],
    ss_width: usize,
    x0: usize,
    x1: usize,
    y0: usize,
    y1: usize,
) -> [u8; 3] {
    let mut r = 0u32;
    let mut g = 0u32;
    let mut b = 0u32;
    let mut count = 0u32;

    for y in y0..y1 {
        for x in x0..x1 {
            let p = fb[y * ss_width + x];
            r += p[0] as u32;
            g += p[1] as u32;
            b += p[2] as u32;
            count += 1;
        }
    }

    if count == 0 {
        [0, 0, 0]
    } else {
        [(r / count) as u8, (g / count) as u8, (b / count) as u8]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_path_pairs_pixel_rows() {
        // 2 wide, 4 tall framebuffer -> 2x2 terminal cells.
        let fb = vec![
            [10, 10, 10],
            [20, 20, 20],
            [30, 30, 30],
            [40, 40, 40],
            [50, 50, 50],
            [60, 60, 60],
            [70, 70, 70],
            [80, 80, 80],
        ];
        let mut cells = Vec::new();
        build_halfblock_cells(&fb, 2, 4, 2, 2, 1, &mut cells);

        assert_eq!(cells[0], ([10, 10, 10], [30, 30, 30]));
        assert_eq!(cells[1], ([20, 20, 20], [40, 40, 40]));
        assert_eq!(cells[2], ([50, 50, 50], [70, 70, 70]));
        assert_eq!(cells[3], ([60, 60, 60], [80, 80, 80]));
    }

    #[test]
    fn supersampled_cells_average_their_windows() {
        // 2x supersampling, one terminal cell: top window is rows 0..2,
        // bottom window rows 2..4, both 2 pixels wide.
        let fb = vec![
            [0, 0, 0],
            [100, 100, 100],
            [50, 50, 50],
            [150, 150, 150],
            [200, 200, 200],
            [200, 200, 200],
            [240, 240, 240],
            [240, 240, 240],
        ];
        let mut cells = Vec::new();
        build_halfblock_cells(&fb, 2, 4, 1, 1, 2, &mut cells);

        assert_eq!(cells.len(), 1);
        let (top, bot) = cells[0];
        assert_eq!(top, [75, 75, 75]);
        assert_eq!(bot, [220, 220, 220]);
    }
}
