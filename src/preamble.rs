//! Priming preamble shared by the LZ encoder and decoder
//!
//! Both sides load these bytes into their windows before the first real byte,
//! so the opening opcodes of a metafile stream can already be coded as
//! back-references. Changing a single byte breaks every existing stream.

/// Reference text loaded into both windows at `start()`
pub const PRIMING_PREAMBLE: &[u8] = b"(DWF V06.00)(W2D V06.00)\
(Units 'mm' ((1 0 0 0)(0 1 0 0)(0 0 1 0)(0 0 0 1)))\
(View 0,0 2147483647,2147483647)(Plot_Info show 0 in 0 0 0 0)\
(Layer 0 \"0\")(LineWeight 0)(LineStyle 0 0 0)(LinePattern Solid)\
(Color 0 255 255 255 255)(Background 0 0 0 255)(Visibility on)\
(Fill off)(Merge_Control opaque)(Font \"Arial\" height 0 rotation 0)\
(Marker_Size 0)(Marker_Symbol 0)(Projection none)\
(Polyline 2 0,0 0,0)(Polytriangle 3 0,0 0,0 0,0)(Contour 1 3 0,0 0,0 0,0)\
(Text 0,0 \"\")(Image 0 0,0 0,0)(Draw_Stage 0)(Embed \"\")(Url \"\")";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preamble_fits_window() {
        assert!(PRIMING_PREAMBLE.len() >= crate::HASH_BYTES);
        assert!(PRIMING_PREAMBLE.len() < crate::WINDOW_SIZE);
    }

    #[test]
    fn test_preamble_is_ascii() {
        assert!(PRIMING_PREAMBLE.is_ascii());
        assert!(PRIMING_PREAMBLE.starts_with(b"(DWF V06.00)"));
    }
}
