//! Page templates the harvester knows how to read.
//!
//! Each submodule is a pure mapping from a fetched document to an
//! [`rsr::Extraction`]: it performs no I/O and keeps no state, so the scan
//! controller can call it once per CID.
//!
//! # Supported Templates
//!
//! | Site | Module | Page |
//! |------|--------|------|
//! | Répertoire de la signalisation routière | [`rsr`] | `Dispositifs/Details.aspx?cid=N` |

pub mod rsr;
