use super::model::PlayerStatsTable;

/// Why a correlation matrix cannot be drawn.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CorrelationError {
    #[error("need at least two numeric columns, found {0}")]
    TooFewColumns(usize),
    #[error("need at least two rows, found {0}")]
    TooFewRows(usize),
}

/// Pairwise Pearson coefficients between the numeric columns of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    /// Row-major, `labels.len()²` entries. `None` where a column is constant.
    values: Vec<Option<f64>>,
}

impl CorrelationMatrix {
    pub fn size(&self) -> usize {
        self.labels.len()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values[row * self.size() + col]
    }

    /// Cells left visible once the diagonal and upper triangle are masked.
    pub fn lower_triangle(&self) -> impl Iterator<Item = (usize, usize, Option<f64>)> + '_ {
        (1..self.size()).flat_map(move |r| (0..r).map(move |c| (r, c, self.get(r, c))))
    }

    /// Smallest defined coefficient in the visible triangle.
    pub fn visible_min(&self) -> Option<f64> {
        self.lower_triangle()
            .filter_map(|(_, _, v)| v)
            .min_by(f64::total_cmp)
    }
}

/// Correlation matrix over every all-numeric column of `table`.
pub fn correlation_matrix(table: &PlayerStatsTable) -> Result<CorrelationMatrix, CorrelationError> {
    let numeric = table.numeric_columns();
    if numeric.len() < 2 {
        return Err(CorrelationError::TooFewColumns(numeric.len()));
    }
    if table.len() < 2 {
        return Err(CorrelationError::TooFewRows(table.len()));
    }

    let columns: Vec<Vec<f64>> = numeric.iter().map(|&c| table.column_f64(c)).collect();
    let n = columns.len();
    let mut values = vec![None; n * n];
    for i in 0..n {
        for j in i..n {
            let r = pearson(&columns[i], &columns[j]);
            values[i * n + j] = r;
            values[j * n + i] = r;
        }
    }

    Ok(CorrelationMatrix {
        labels: numeric.iter().map(|&c| table.columns[c].clone()).collect(),
        values,
    })
}

/// Pearson's r; `None` when either side has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let mean = |v: &[f64]| v[..n].iter().sum::<f64>() / n as f64;
    let (mx, my) = (mean(xs), mean(ys));

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs[..n].iter().zip(&ys[..n]) {
        let (dx, dy) = (x - mx, y - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}
