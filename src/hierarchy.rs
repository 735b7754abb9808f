// src/hierarchy.rs
//
// Geometric multigrid hierarchy.
//
// Each coarser level is an independent rebuild of the stencil matrix at half the grid
// size (no Galerkin product). Levels are stored finest-first in a Vec; level k owns the
// linkage (injection map + transfer vectors) down to level k + 1.

use tracing::debug;

use crate::buffer::AlignedBuf;
use crate::error::{BenchError, Result};
use crate::matrix::StencilMatrix;
use crate::vector::Vector;

/// Depth used by the benchmark driver.
pub const DEFAULT_LEVELS: usize = 4;

/// Transfer data between a fine level and the next coarser one.
pub struct MultigridLinkage {
    /// Coarse row -> fine row at (2·ixc, 2·iyc, 2·izc).
    pub f2c_operator: AlignedBuf<u32>,
    /// Coarse residual.
    pub rc: Vector,
    /// Coarse correction.
    pub xc: Vector,
    /// Fine-level A·x.
    pub axf: Vector,
    pub pre_smooth: usize,
    pub post_smooth: usize,
}

pub struct MultigridLevel {
    pub matrix: StencilMatrix,
    /// `None` on the coarsest level.
    pub linkage: Option<MultigridLinkage>,
}

pub struct MultigridHierarchy {
    pub levels: Vec<MultigridLevel>,
}

/// Build the next coarser matrix and the linkage from `fine` to it.
pub fn coarsen(fine: &StencilMatrix) -> Result<(StencilMatrix, MultigridLinkage)> {
    let coarse_grid = fine.grid.coarsened().ok_or_else(|| {
        BenchError::Configuration(format!(
            "grid size {} cannot be coarsened (must be even)",
            fine.n()
        ))
    })?;

    let nrowc = coarse_grid.n_cells();
    let mut f2c_operator: AlignedBuf<u32> = AlignedBuf::zeroed(nrowc, "f2c_operator")?;

    let nc = coarse_grid.n;
    for izc in 0..nc {
        for iyc in 0..nc {
            for ixc in 0..nc {
                let rowc = coarse_grid.idx(ixc, iyc, izc);
                f2c_operator[rowc] = fine.grid.idx(2 * ixc, 2 * iyc, 2 * izc) as u32;
            }
        }
    }

    let coarse = StencilMatrix::build(nc)?;
    let linkage = MultigridLinkage {
        f2c_operator,
        rc: Vector::new(coarse.nrow)?,
        xc: Vector::new(coarse.nrow)?,
        axf: Vector::new(fine.nrow)?,
        pre_smooth: 1,
        post_smooth: 1,
    };

    debug!(fine = fine.n(), coarse = nc, "coarsened level");
    Ok((coarse, linkage))
}

impl MultigridHierarchy {
    /// Build up to `max_levels` levels starting from an n³ grid.
    ///
    /// Coarsening stops early once the grid size turns odd, so the result may be shallower
    /// than requested. `max_levels` of 0 is treated as 1.
    pub fn build(n: usize, max_levels: usize) -> Result<Self> {
        Self::from_finest(StencilMatrix::build(n)?, max_levels)
    }

    /// Grow a hierarchy below an already built matrix.
    pub fn from_finest(finest: StencilMatrix, max_levels: usize) -> Result<Self> {
        let max_levels = max_levels.max(1);
        let mut levels = vec![MultigridLevel {
            matrix: finest,
            linkage: None,
        }];

        while levels.len() < max_levels {
            let Some(last) = levels.last_mut() else {
                break;
            };
            if last.matrix.grid.coarsened().is_none() {
                break;
            }
            let (coarse, linkage) = coarsen(&last.matrix)?;
            last.linkage = Some(linkage);
            levels.push(MultigridLevel {
                matrix: coarse,
                linkage: None,
            });
        }

        debug!(
            depth = levels.len(),
            sizes = ?levels.iter().map(|l| l.matrix.n()).collect::<Vec<_>>(),
            "built multigrid hierarchy"
        );
        Ok(Self { levels })
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn finest(&self) -> &StencilMatrix {
        &self.levels[0].matrix
    }

    pub fn finest_mut(&mut self) -> &mut StencilMatrix {
        &mut self.levels[0].matrix
    }

    /// Grid sizes, finest first.
    pub fn sizes(&self) -> Vec<usize> {
        self.levels.iter().map(|l| l.matrix.n()).collect()
    }
}
