/*! Received-stage filters.

Cheap document-level checks run before any hashing:
- [MinLength] rejects documents with too little normalized text,
- [UrlFilter] keeps documents whose URL points to a given region (TLD, subdomain or path segment).

Filters implement [Filter].
!*/
mod filter;
mod record;
mod region;

pub use filter::Filter;
pub use record::MinLength;
pub use region::{UrlFilter, UrlFilterConfig};
