use std::collections::HashMap;

use ndarray::Array2;

/// A connected group of above-threshold pixels.
#[derive(Clone, Debug)]
pub struct Blob {
    /// Number of pixels in the blob.
    pub area: usize,
    /// Bounding box: (min_row, max_row, min_col, max_col).
    pub bbox: (usize, usize, usize, usize),
    /// Background-subtracted flux summed over the blob.
    pub flux: f64,
    /// Brightest background-subtracted pixel.
    pub peak: f64,
    /// Flux-weighted centroid column.
    pub x: f64,
    /// Flux-weighted centroid row.
    pub y: f64,
}

#[derive(Default)]
struct Accumulator {
    area: usize,
    bbox: Option<(usize, usize, usize, usize)>,
    flux: f64,
    peak: f64,
    sum_x: f64,
    sum_y: f64,
}

/// Label the 4-connected components of `mask` (two-pass, union-find) and
/// measure each one on `values` minus `background`.
///
/// Returns blobs sorted by flux, brightest first.
pub fn label_blobs(mask: &Array2<bool>, values: &Array2<f32>, background: f64) -> Vec<Blob> {
    let (h, w) = mask.dim();
    if h == 0 || w == 0 {
        return Vec::new();
    }

    let mut labels = Array2::<u32>::zeros((h, w));
    let mut next_label: u32 = 1;
    // Index 0 unused; labels start at 1.
    let mut parent: Vec<u32> = vec![0; h * w / 2 + 2];

    // Pass 1: provisional labels.
    for row in 0..h {
        for col in 0..w {
            if !mask[[row, col]] {
                continue;
            }

            let up = if row > 0 { labels[[row - 1, col]] } else { 0 };
            let left = if col > 0 { labels[[row, col - 1]] } else { 0 };

            labels[[row, col]] = match (up > 0, left > 0) {
                (false, false) => {
                    if next_label as usize >= parent.len() {
                        parent.resize(parent.len() * 2, 0);
                    }
                    parent[next_label as usize] = next_label;
                    next_label += 1;
                    next_label - 1
                }
                (true, false) => up,
                (false, true) => left,
                (true, true) => {
                    if up != left {
                        union(&mut parent, up, left);
                    }
                    up.min(left)
                }
            };
        }
    }

    for i in 1..next_label as usize {
        parent[i] = find(&parent, i as u32);
    }

    // Pass 2: accumulate per root label.
    let mut acc = HashMap::<u32, Accumulator>::new();
    for row in 0..h {
        for col in 0..w {
            let lbl = labels[[row, col]];
            if lbl == 0 {
                continue;
            }
            let entry = acc.entry(parent[lbl as usize]).or_default();
            let v = (values[[row, col]] as f64 - background).max(0.0);

            entry.area += 1;
            entry.bbox = Some(match entry.bbox {
                None => (row, row, col, col),
                Some((r0, r1, c0, c1)) => (r0.min(row), r1.max(row), c0.min(col), c1.max(col)),
            });
            entry.flux += v;
            entry.peak = entry.peak.max(v);
            entry.sum_x += v * col as f64;
            entry.sum_y += v * row as f64;
        }
    }

    let mut blobs: Vec<Blob> = acc
        .into_values()
        .filter(|a| a.flux > 0.0)
        .filter_map(|a| {
            Some(Blob {
                area: a.area,
                bbox: a.bbox?,
                flux: a.flux,
                peak: a.peak,
                x: a.sum_x / a.flux,
                y: a.sum_y / a.flux,
            })
        })
        .collect();
    blobs.sort_unstable_by(|a, b| b.flux.total_cmp(&a.flux));
    blobs
}

/// Returns true if the bounding box touches any edge of the image.
pub fn touches_border(bbox: (usize, usize, usize, usize), height: usize, width: usize) -> bool {
    let (min_row, max_row, min_col, max_col) = bbox;
    min_row == 0 || max_row >= height - 1 || min_col == 0 || max_col >= width - 1
}

fn find(parent: &[u32], mut x: u32) -> u32 {
    while parent[x as usize] != x {
        x = parent[x as usize];
    }
    x
}

fn union(parent: &mut [u32], a: u32, b: u32) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        let (small, big) = if ra < rb { (ra, rb) } else { (rb, ra) };
        parent[big as usize] = small;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_blobs_sorted_by_flux() {
        let mut values = Array2::<f32>::zeros((8, 8));
        values[[1, 1]] = 1.0;
        values[[1, 2]] = 1.0;
        values[[5, 5]] = 4.0;
        let mask = values.mapv(|v| v > 0.5);

        let blobs = label_blobs(&mask, &values, 0.0);
        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].area, 1);
        assert!((blobs[0].x - 5.0).abs() < 1e-9);
        assert_eq!(blobs[1].area, 2);
        assert!((blobs[1].x - 1.5).abs() < 1e-9);
        assert!((blobs[1].y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_u_shape_merges_into_one() {
        let mut values = Array2::<f32>::zeros((4, 5));
        for row in 0..3 {
            values[[row, 0]] = 1.0;
            values[[row, 4]] = 1.0;
        }
        for col in 0..5 {
            values[[3, col]] = 1.0;
        }
        let mask = values.mapv(|v| v > 0.5);
        let blobs = label_blobs(&mask, &values, 0.0);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 11);
        assert_eq!(blobs[0].bbox, (0, 3, 0, 4));
    }
}
