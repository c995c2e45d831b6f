//! Shapes handed to an external renderer.
//!
//! Nothing here draws. A renderer receives node positions, an edge list of
//! index pairs into the same ordering, one signed statistic per edge and the
//! labels, and decides how to map them onto a surface.

/// Everything a renderer needs to draw a network
#[derive(Debug, Clone, PartialEq)]
pub struct RenderData {
    /// (x, y) per node, in network order
    pub positions: Vec<(f64, f64)>,
    /// Edges as index pairs into `positions`
    pub edge_list: Vec<(usize, usize)>,
    /// Signed statistic per edge, for color and line weight
    pub edge_statistics: Vec<f64>,
    /// Label for the edge color bar (the correlation method name)
    pub colorbar_label: String,
    /// Node labels, in network order
    pub labels: Vec<String>,
    /// Axis names of the layout
    pub axes: [String; 2],
}

impl RenderData {
    /// Labels longer than `max_len` characters become their prefix followed by `.`
    pub fn shortened_labels(&self, max_len: usize) -> Vec<String> {
        self.labels
            .iter()
            .map(|label| shorten_label(label, max_len))
            .collect()
    }

    /// Half-width of a color scale centered on zero covering every edge
    pub fn color_halfrange(&self) -> f64 {
        self.edge_statistics
            .iter()
            .filter(|s| s.is_finite())
            .fold(0.0_f64, |acc, s| acc.max(s.abs()))
    }

    /// Segment endpoints for every edge
    pub fn segments(&self) -> Vec<((f64, f64), (f64, f64))> {
        self.edge_list
            .iter()
            .filter_map(|&(i, j)| Some((*self.positions.get(i)?, *self.positions.get(j)?)))
            .collect()
    }
}

/// Shorten one label to `max_len` characters plus a trailing `.`
pub fn shorten_label(label: &str, max_len: usize) -> String {
    if label.chars().count() > max_len {
        let prefix: String = label.chars().take(max_len).collect();
        format!("{}.", prefix)
    } else {
        label.to_string()
    }
}
