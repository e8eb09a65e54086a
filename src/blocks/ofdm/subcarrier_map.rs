use crate::blocks::ofdm::OfdmError;

/// Data subcarriers within the occupied carriers.
///
/// Built once from a hex mask. Each hex digit covers four carriers, most
/// significant bit first, so `"FE7F"` leaves carriers 7 and 8 (around DC)
/// empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubcarrierMap {
    indices: Vec<usize>,
    occupied: usize,
}

impl SubcarrierMap {
    /// Create map from a hex mask covering `occupied` carriers.
    pub fn from_hex(mask: &str, occupied: usize) -> Result<Self, OfdmError> {
        let bits = parse_mask(mask)?;
        let mut indices = Vec::new();
        for (index, set) in bits.into_iter().enumerate() {
            if !set {
                continue;
            }
            if index >= occupied {
                return Err(OfdmError::SubcarrierIndex { index, occupied });
            }
            indices.push(index);
        }
        Self::from_indices(indices, occupied)
    }

    /// Create map from explicit carrier indices.
    pub fn from_indices(indices: Vec<usize>, occupied: usize) -> Result<Self, OfdmError> {
        if indices.len() > occupied {
            return Err(OfdmError::SubcarrierOverflow {
                allocated: indices.len(),
                occupied,
            });
        }
        if let Some(&index) = indices.iter().find(|&&i| i >= occupied) {
            return Err(OfdmError::SubcarrierIndex { index, occupied });
        }
        if indices.is_empty() {
            return Err(OfdmError::InvalidParameter(
                "no data subcarriers".to_string(),
            ));
        }
        Ok(SubcarrierMap { indices, occupied })
    }

    /// Default map: `"FE7F"` in the center, padded with full digits on both
    /// sides until it spans `occupied` carriers.
    pub fn default_for(occupied: usize) -> Result<Self, OfdmError> {
        if occupied < 16 {
            return Err(OfdmError::InvalidParameter(format!(
                "default subcarrier map needs at least 16 occupied carriers, got {occupied}"
            )));
        }

        let mut mask = String::from("FE7F");
        let mut diff = occupied - 4 * mask.len();
        while diff > 7 {
            mask.insert(0, 'f');
            mask.push('f');
            diff -= 8;
        }

        let mut diff_left = 0;
        if diff > 0 {
            diff_left = diff.div_ceil(2);
            let diff_right = diff - diff_left;
            mask.insert(0, hex_digit((1 << diff_left) - 1));
            mask.push(hex_digit(0xf ^ ((1 << diff_right) - 1)));
        }

        // the left pad digit shifts the mask by diff_left carriers
        let bits = parse_mask(&mask)?;
        let indices = bits
            .into_iter()
            .enumerate()
            .take(4 * (occupied / 4 + diff_left))
            .filter(|(_, set)| *set)
            .filter_map(|(i, _)| i.checked_sub(diff_left))
            .filter(|&i| i < occupied)
            .collect();

        Self::from_indices(indices, occupied)
    }

    /// Carrier indices carrying data, in transmission order
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Number of data carriers
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Map without data carriers
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of occupied carriers the map refers to
    pub fn occupied(&self) -> usize {
        self.occupied
    }
}

fn hex_digit(v: u32) -> char {
    char::from_digit(v, 16).unwrap_or('0')
}

fn parse_mask(mask: &str) -> Result<Vec<bool>, OfdmError> {
    if mask.is_empty() {
        return Err(OfdmError::InvalidMask(mask.to_string()));
    }
    let mut bits = Vec::with_capacity(4 * mask.len());
    for c in mask.chars() {
        let v = c
            .to_digit(16)
            .ok_or_else(|| OfdmError::InvalidMask(mask.to_string()))?;
        for j in 0..4 {
            bits.push((v >> (3 - j)) & 1 == 1);
        }
    }
    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_mask() {
        let m = SubcarrierMap::from_hex("FE7F", 16).unwrap();
        let expected: Vec<usize> = (0..16).filter(|&i| i != 7 && i != 8).collect();
        assert_eq!(m.indices(), &expected[..]);
        assert_eq!(SubcarrierMap::default_for(16).unwrap(), m);
    }

    #[test]
    fn default_padding() {
        let m = SubcarrierMap::default_for(200).unwrap();
        assert_eq!(m.len(), 198);
        assert!(!m.indices().contains(&99));
        assert!(!m.indices().contains(&100));
        assert_eq!(m.indices()[0], 0);
        assert_eq!(*m.indices().last().unwrap(), 199);

        let m = SubcarrierMap::default_for(64).unwrap();
        assert_eq!(m.len(), 62);
        assert!(!m.indices().contains(&31));
        assert!(!m.indices().contains(&32));
    }

    #[test]
    fn odd_padding_stays_in_range() {
        for occupied in 16..80 {
            let m = SubcarrierMap::default_for(occupied).unwrap();
            assert!(m.len() <= occupied);
            assert!(m.indices().iter().all(|&i| i < occupied));
        }
    }

    #[test]
    fn invalid() {
        assert_eq!(
            SubcarrierMap::from_hex("FFFFF", 16),
            Err(OfdmError::SubcarrierIndex {
                index: 16,
                occupied: 16
            })
        );
        assert!(matches!(
            SubcarrierMap::from_hex("FX", 8),
            Err(OfdmError::InvalidMask(_))
        ));
        assert!(matches!(
            SubcarrierMap::from_indices(vec![0, 1, 2], 2),
            Err(OfdmError::SubcarrierOverflow { .. })
        ));
        assert!(SubcarrierMap::default_for(8).is_err());
    }
}
