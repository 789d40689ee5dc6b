//! Dadac core library: Density Peaks Advanced clustering.
//!
//! Points get an adaptive-scale density estimate, peaks are found by
//! following nearest-denser links, saddles between peaks are detected and
//! peaks whose saddle is not significant at confidence `Z` are merged.
#![cfg_attr(docsrs, feature(doc_cfg))]

mod borders;
mod builder;
mod dadac;
mod datasource;
mod density;
mod dimension;
mod error;
mod halo;
mod image;
mod memory;
mod merge;
mod neighbourhood;
mod peaks;
mod point;
mod result;
#[cfg(test)]
mod test_utils;

pub use crate::{
    borders::{
        Border, BorderStorage, BorderStore, Borders, DEFAULT_BORDER_BUDGET_BYTES, DenseBorders,
        SparseBorders, detect_borders,
    },
    builder::DadacBuilder,
    dadac::Dadac,
    datasource::DataSource,
    density::{
        DEFAULT_LIKELIHOOD_THRESHOLD, DensityField, DensityParams, estimate_densities,
        select_kstar, standard_error,
    },
    dimension::{TwoNnEstimate, estimate_intrinsic_dimension},
    error::{
        DadacError, DadacErrorCode, DataSourceError, DataSourceErrorCode, ErrorKind,
        NeighbourhoodFault, NumericFault, Result,
    },
    halo::{HaloLabelling, find_halo},
    image::{GridNeighbours, ImageDensity, PixelGrid},
    memory::{dense_border_bytes, estimate_peak_bytes, format_bytes},
    merge::{Merged, merge_peaks, merge_strength, saddle_bound},
    neighbourhood::{ExactNeighbours, Neighbour, NeighbourProvider, Neighbourhoods},
    peaks::{Peaks, discover_peaks},
    point::{PointInfo, density_order, is_denser},
    result::{BorderEntry, ClusterId, ClusteringResult, PointRecord, StageTimings},
};
