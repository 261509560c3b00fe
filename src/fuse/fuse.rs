use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::{
    error::Side,
    fuse::{aggregate, apportion::{self, CandidatePair, SourceColumns}, FuseOptions},
    geom::PairPredicate,
    layer::Layer,
};

/// Transfer the declared attributes of `from_layer` onto `into_layer`, weighted by polygon overlap.
///
/// Size columns are scaled by the share of each source polygon inside the overlap,
/// density columns by the share of each target polygon. Contributions of all source
/// polygons overlapping a target row are summed. The result has exactly the rows,
/// key, geometries and EPSG code of `into_layer`, followed by the size columns, the
/// density columns and, when requested, `_OVERLAP`. Rows with no overlapping source
/// polygon hold null in every added column.
#[instrument(skip_all, fields(into = into_layer.len(), from = from_layer.len()))]
pub fn fuse(into_layer: &Layer, from_layer: &Layer, options: &FuseOptions) -> Result<Layer> {
    options.validate()?;
    let (sizes, densities) = (options.sizes(), options.densities());

    let columns = SourceColumns::read(from_layer, &sizes, &densities)?;
    let pairs = pair(into_layer, from_layer, options.predicate)
        .context("[fuse] candidate pairing failed")?;
    debug!(pairs = pairs.len(), "measured candidate pairs");

    let contributions = apportion::apportion(&pairs, &columns);
    let sums = aggregate::group_and_sum(&contributions, into_layer.len(), columns.len());

    let fused = aggregate::left_merge(into_layer, &columns.names, sums, options.include_overlap)
        .context("[fuse] aggregation failed")?;

    info!(rows = fused.len(), columns = columns.len(), "fused layer");
    Ok(fused)
}

/// Every overlapping (target, source) pair with its areas and overlap fractions,
/// sorted by target row, then source row.
pub fn candidate_pairs(into_layer: &Layer, from_layer: &Layer, predicate: PairPredicate) -> Result<Vec<CandidatePair>> {
    pair(into_layer, from_layer, predicate).context("[candidate_pairs] candidate pairing failed")
}

fn pair(into_layer: &Layer, from_layer: &Layer, predicate: PairPredicate) -> Result<Vec<CandidatePair>> {
    let (into, from) = (into_layer.geoms(), from_layer.geoms());
    into.validate(Side::Into)?;
    from.validate(Side::From)?;
    into.check_frame(from)?;

    let rows = into.candidate_pairs(from, predicate);
    Ok(apportion::measure_pairs(into, from, &rows))
}

/// Fuse with column lists given directly, using the default pairing predicate.
pub fn layerfuse(
    into_layer: &Layer,
    from_layer: &Layer,
    size_columns: &[&str],
    density_columns: &[&str],
    include_overlap: bool,
) -> Result<Layer> {
    let options = FuseOptions::new()
        .with_size_columns(size_columns.iter().copied())
        .with_density_columns(density_columns.iter().copied())
        .with_overlap(include_overlap);
    fuse(into_layer, from_layer, &options)
}
