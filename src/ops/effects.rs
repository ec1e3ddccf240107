// ============================================================================
// MOSAIC: random seeds, nearest-seed clustering, flat average per cluster
// ============================================================================
//
// 1. Draw `seed_count` distinct linear indices uniformly from the grid.
// 2. Number the seeds 1..=n in row-major scan order.
// 3. Give every other pixel the cluster of its nearest seed (Euclidean
//    distance); on a tie the seed that comes first in scan order wins.
// 4. Paint each cluster with the truncated integer mean of its pixels.
// ============================================================================

use std::collections::BTreeSet;

use image::Rgb;
use rand::Rng;
use rayon::prelude::*;

use crate::canvas::RasterImage;
use crate::error::{EditorError, EditorResult};

impl RasterImage {
    pub fn apply_mosaic<R: Rng + ?Sized>(&mut self, seed_count: usize, rng: &mut R) -> EditorResult<()> {
        let w = self.width() as usize;
        let area = self.pixels().len();
        if seed_count == 0 || seed_count > area {
            return Err(EditorError::invalid(format!(
                "mosaic seed count must be between 1 and {}, got {}",
                area, seed_count
            )));
        }

        let seeds = pick_seeds(area, seed_count, rng);
        let clusters = assign_clusters(w, area, &seeds);
        let averages = cluster_averages(self, &clusters, seeds.len());

        let out: Vec<Rgb<u16>> = clusters.iter().map(|&c| averages[c]).collect();
        self.replace_grid(self.width(), self.height(), out);
        Ok(())
    }
}

/// Distinct linear indices in ascending (scan) order.  Duplicates are
/// redrawn until `count` unique indices are collected.
fn pick_seeds<R: Rng + ?Sized>(area: usize, count: usize, rng: &mut R) -> Vec<usize> {
    let mut chosen = BTreeSet::new();
    while chosen.len() < count {
        chosen.insert(rng.gen_range(0..area));
    }
    chosen.into_iter().collect()
}

/// Cluster id (index into `seeds`) for every pixel, row-major.
fn assign_clusters(w: usize, area: usize, seeds: &[usize]) -> Vec<usize> {
    let points: Vec<(f64, f64)> = seeds
        .iter()
        .map(|&idx| ((idx % w) as f64, (idx / w) as f64))
        .collect();

    let mut clusters = vec![0usize; area];
    clusters.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for (x, slot) in row.iter_mut().enumerate() {
            let idx = y * w + x;
            if let Ok(own) = seeds.binary_search(&idx) {
                *slot = own;
                continue;
            }
            let mut best = 0usize;
            let mut best_dist = f64::INFINITY;
            for (s, &(sx, sy)) in points.iter().enumerate() {
                let dist = (sx - x as f64).hypot(sy - y as f64);
                // strict: ties keep the earlier seed
                if dist < best_dist {
                    best_dist = dist;
                    best = s;
                }
            }
            *slot = best;
        }
    });
    clusters
}

/// Truncating integer mean of each cluster's channels.
fn cluster_averages(img: &RasterImage, clusters: &[usize], count: usize) -> Vec<Rgb<u16>> {
    let mut sums = vec![[0u64; 3]; count];
    let mut sizes = vec![0u64; count];
    for (p, &c) in img.pixels().iter().zip(clusters) {
        for (acc, v) in sums[c].iter_mut().zip(p.color().0) {
            *acc += v as u64;
        }
        sizes[c] += 1;
    }
    sums.iter()
        .zip(&sizes)
        .map(|(sum, &n)| {
            // every cluster holds at least its own seed
            Rgb(sum.map(|s| (s / n.max(1)) as u16))
        })
        .collect()
}
