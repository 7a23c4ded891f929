/*!
# Population Pyramid

A browser-based tool that turns a spreadsheet of age bands into a population
pyramid chart, built in Rust.

## Overview

The user uploads a spreadsheet holding an age-band label column and two value
columns (for example the percentage of men and women in each band). The
application draws the two groups as back-to-back horizontal bars around a
shared zero axis, lets the user tweak about forty cosmetic options, and
offers the chart as SVG, PDF and PNG downloads.

## Architecture

Every request runs the whole pipeline from scratch; nothing is kept between
requests.

```text
upload ──> loader ──> Table ──> pyramid ──> PyramidData ──> graph ──> SVG
                                                                    │
                                  options (RenderConfig) ───────────┤
                                                                    v
                                                         downloader ──> SVG / PDF / PNG
```

### Frontend Layer
- **Technologies**: HTML, CSS, plain JavaScript
- A single form page served at `/` with the chart options, the data
  preview, the live chart and three download buttons

### Backend Layer
- **Technologies**: Rust, axum
- **Core Components**:
  - Loader - reads CSV and Excel/OpenDocument workbooks into a [`table::Table`]
  - Pyramid data - picks the three configured columns, checks they are
    numeric and derives the symmetric percentage tick scale
  - Chart renderer - draws the pyramid with plotters' SVG backend
  - Exporter - converts the SVG to PDF (svg2pdf) or PNG (resvg)

## Modules

- **cell**: Single spreadsheet value (empty, number or text)
- **table**: Header row plus data rows, column lookup and preview
- **loader**: CSV and workbook loading
- **options**: Every chart and export option with its default
- **pyramid**: Age bands, plotted values and tick scale
- **graph**: Chart rendering
- **downloader**: Export size math, PDF/PNG conversion, sample workbook
- **error**: Error type shared by all modules
- **app**: Routing and request handlers (feature `web`)

## REST API Endpoints

- `GET /` - Form page
- `GET /api/defaults` - Default configuration as JSON
- `GET /api/template` - Example `.xlsx` workbook
- `POST /api/render` - Preview rows plus the chart as SVG
- `POST /api/export/{svg|pdf|png}` - Chart as a downloadable file
*/

pub mod cell;
pub mod downloader;
pub mod error;
pub mod graph;
pub mod loader;
pub mod options;
pub mod pyramid;
pub mod table;

#[cfg(feature = "web")]
pub mod app;

pub use cell::CellValue;
pub use downloader::{ExportFormat, ExportSettings, ExportUnit, ExportedFile, export_chart};
pub use error::{PyramidError, Result};
pub use graph::create_pyramid_chart;
pub use loader::load_table;
pub use options::{ChartOptions, RenderConfig};
pub use pyramid::{AgeBand, PyramidData, TickScale};
pub use table::{Table, TablePreview};
