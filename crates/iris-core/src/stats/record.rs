use crate::io::reference::AttrValue;

use super::measure::Measure;

/// Statistics of one processed exposure.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameStatsRecord {
    pub odometer: i64,
    /// Number of reference stars fitted.
    pub star_nb: usize,
    pub dx_pix_1: Measure,
    pub dy_pix_1: Measure,
    pub dx_pix_2: Measure,
    pub dy_pix_2: Measure,
    pub fwhm_pix_1: Measure,
    pub fwhm_pix_2: Measure,
    pub fwhm_arc_1: Measure,
    pub fwhm_arc_2: Measure,
    /// Median merged-frame aperture flux.
    pub flux: Measure,
    /// Magnitudes of dimming relative to the reference frame.
    pub extinction: Measure,
    pub background: Measure,
}

impl FrameStatsRecord {
    /// Named measures, in storage order.
    pub fn measures(&self) -> [(&'static str, Measure); 11] {
        [
            ("dx-pix-1", self.dx_pix_1),
            ("dy-pix-1", self.dy_pix_1),
            ("dx-pix-2", self.dx_pix_2),
            ("dy-pix-2", self.dy_pix_2),
            ("fwhm-pix-1", self.fwhm_pix_1),
            ("fwhm-pix-2", self.fwhm_pix_2),
            ("fwhm-arc-1", self.fwhm_arc_1),
            ("fwhm-arc-2", self.fwhm_arc_2),
            ("flux", self.flux),
            ("extinction", self.extinction),
            ("background", self.background),
        ]
    }

    fn measure_mut(&mut self, name: &str) -> Option<&mut Measure> {
        Some(match name {
            "dx-pix-1" => &mut self.dx_pix_1,
            "dy-pix-1" => &mut self.dy_pix_1,
            "dx-pix-2" => &mut self.dx_pix_2,
            "dy-pix-2" => &mut self.dy_pix_2,
            "fwhm-pix-1" => &mut self.fwhm_pix_1,
            "fwhm-pix-2" => &mut self.fwhm_pix_2,
            "fwhm-arc-1" => &mut self.fwhm_arc_1,
            "fwhm-arc-2" => &mut self.fwhm_arc_2,
            "flux" => &mut self.flux,
            "extinction" => &mut self.extinction,
            "background" => &mut self.background,
            _ => return None,
        })
    }

    /// Flat attribute list: `odometer_nb`, `star_nb`, then every measure as
    /// `<name>` and `<name>_err`.
    pub fn to_attributes(&self) -> Vec<(String, AttrValue)> {
        let mut attrs = vec![
            ("odometer_nb".to_string(), AttrValue::Int(self.odometer)),
            ("star_nb".to_string(), AttrValue::Int(self.star_nb as i64)),
        ];
        for (name, m) in self.measures() {
            attrs.push((name.to_string(), AttrValue::Float(m.value)));
            attrs.push((format!("{}_err", name), AttrValue::Float(m.error)));
        }
        attrs
    }

    /// Rebuild a record from stored attributes. Measures absent from the
    /// list stay undefined; `None` without an odometer number.
    pub fn from_attributes(attrs: &[(String, AttrValue)]) -> Option<Self> {
        let lookup = |key: &str| attrs.iter().find(|(n, _)| n == key).map(|(_, v)| *v);
        let odometer = lookup("odometer_nb")?.as_i64()?;
        let star_nb = lookup("star_nb")
            .and_then(AttrValue::as_i64)
            .unwrap_or(0)
            .max(0) as usize;

        let mut record = Self::empty(odometer);
        record.star_nb = star_nb;
        for (name, value) in attrs {
            let (base, is_err) = match name.strip_suffix("_err") {
                Some(base) => (base, true),
                None => (name.as_str(), false),
            };
            if let Some(m) = record.measure_mut(base) {
                if is_err {
                    m.error = value.as_f64();
                } else {
                    m.value = value.as_f64();
                }
            }
        }
        Some(record)
    }

    /// A record with every measure undefined.
    pub fn empty(odometer: i64) -> Self {
        let u = Measure::undefined();
        Self {
            odometer,
            star_nb: 0,
            dx_pix_1: u,
            dy_pix_1: u,
            dx_pix_2: u,
            dy_pix_2: u,
            fwhm_pix_1: u,
            fwhm_pix_2: u,
            fwhm_arc_1: u,
            fwhm_arc_2: u,
            flux: u,
            extinction: u,
            background: u,
        }
    }

    /// Value of a statistic by attribute name (`"fwhm-arc-1"`,
    /// `"fwhm-arc-1_err"`, `"star_nb"`, ...).
    pub fn get(&self, key: &str) -> Option<AttrValue> {
        self.to_attributes()
            .into_iter()
            .find(|(n, _)| n == key)
            .map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_names_and_order() {
        let attrs = FrameStatsRecord::empty(42).to_attributes();
        assert_eq!(attrs.len(), 2 + 2 * 11);
        assert_eq!(attrs[0].0, "odometer_nb");
        assert_eq!(attrs[1].0, "star_nb");
        assert_eq!(attrs[2].0, "dx-pix-1");
        assert_eq!(attrs[3].0, "dx-pix-1_err");
    }

    #[test]
    fn test_from_attributes_restores_measures() {
        let mut record = FrameStatsRecord::empty(7);
        record.star_nb = 12;
        record.extinction = Measure::new(0.75, 0.1);
        let back = FrameStatsRecord::from_attributes(&record.to_attributes()).unwrap();
        assert_eq!(back.odometer, 7);
        assert_eq!(back.star_nb, 12);
        assert_eq!(back.extinction, Measure::new(0.75, 0.1));
        assert!(back.flux.value.is_nan());
    }

    #[test]
    fn test_from_attributes_requires_odometer() {
        let attrs = vec![("flux".to_string(), AttrValue::Float(1.0))];
        assert!(FrameStatsRecord::from_attributes(&attrs).is_none());
    }
}
