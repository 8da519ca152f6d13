use super::header::*;
use super::question::*;
use super::resource::*;
use super::*;
use shared::error::*;

// A Parser allows incrementally parsing a DNS message.
//
// When parsing is started, the Header is parsed. Next, each question can be
// either parsed or skipped. Resources are then read one at a time across
// the answer, authority and additional sections in wire order.
#[derive(Default)]
pub(crate) struct Parser<'a> {
    pub(crate) msg: &'a [u8],
    pub(crate) header: HeaderInternal,

    pub(crate) section: Section,
    pub(crate) off: usize,
    pub(crate) index: usize,
}

impl<'a> Parser<'a> {
    // start parses the header and enables the parsing of questions.
    pub(crate) fn start(&mut self, msg: &'a [u8]) -> Result<Header> {
        *self = Parser {
            msg,
            ..Default::default()
        };
        self.off = self.header.unpack(msg, 0)?;
        self.section = Section::Questions;
        Ok(self.header.header())
    }

    // offset is the position of the next unread byte.
    pub(crate) fn offset(&self) -> usize {
        self.off
    }

    // check_advance moves past sections that have no entries left.
    fn check_advance(&mut self, sec: Section) -> Result<()> {
        if self.section < sec {
            return Err(Error::ErrNotStarted);
        }
        if self.section > sec {
            return Err(Error::ErrSectionDone);
        }
        if self.index == self.header.count(sec) as usize {
            self.index = 0;
            self.section = self.section.next();
            return Err(Error::ErrSectionDone);
        }
        Ok(())
    }

    // question parses a single question.
    #[cfg(test)]
    pub(crate) fn question(&mut self) -> Result<Question> {
        self.check_advance(Section::Questions)?;
        let mut q = Question::default();
        self.off = q.unpack(self.msg, self.off)?;
        self.index += 1;
        Ok(q)
    }

    // all_questions parses all questions.
    #[cfg(test)]
    pub(crate) fn all_questions(&mut self) -> Result<Vec<Question>> {
        let mut qs = vec![];
        loop {
            match self.question() {
                Err(Error::ErrSectionDone) => return Ok(qs),
                Err(err) => return Err(err),
                Ok(q) => qs.push(q),
            }
        }
    }

    // skip_all_questions skips all questions.
    pub(crate) fn skip_all_questions(&mut self) -> Result<()> {
        loop {
            match self.check_advance(Section::Questions) {
                Err(Error::ErrSectionDone) => return Ok(()),
                Err(err) => return Err(err),
                Ok(()) => {
                    self.off = Question::skip(self.msg, self.off)?;
                    self.index += 1;
                }
            }
        }
    }

    // next_resource_section finds the section of the next unread record,
    // stepping over exhausted sections.
    fn next_resource_section(&mut self) -> Result<Section> {
        if self.section < Section::Answers {
            return Err(Error::ErrNotStarted);
        }
        loop {
            match self.check_advance(self.section) {
                Ok(()) => return Ok(self.section),
                Err(Error::ErrSectionDone) if self.section < Section::Done => continue,
                Err(err) => return Err(err),
            }
        }
    }

    // resource parses the next record of the answer, authority or
    // additional sections.
    //
    // The parser does not move when the record header cannot be read or
    // claims more data than the message holds. Otherwise it always ends up
    // past the record, even when the payload is rejected, so the caller can
    // carry on with the next one.
    pub(crate) fn resource(&mut self) -> Result<Resource> {
        self.next_resource_section()?;

        let mut header = ResourceHeader::default();
        let off = header.unpack(self.msg, self.off)?;
        let end = off + header.length as usize;
        if end > self.msg.len() {
            return Err(Error::ErrResourceLen);
        }

        self.off = end;
        self.index += 1;

        let (data, data_end) = unpack_record_data(&header, self.msg, off)?;
        if data_end != end {
            return Err(Error::ErrResourceLen);
        }
        Ok(Resource { header, data })
    }

    // all_resources parses every record of one section, failing on the
    // first that does not decode.
    #[cfg(test)]
    pub(crate) fn all_resources(&mut self, sec: Section) -> Result<Vec<Resource>> {
        let mut rs = vec![];
        loop {
            if let Err(err) = self.check_advance(sec) {
                if err == Error::ErrSectionDone {
                    return Ok(rs);
                }
                return Err(err);
            }
            rs.push(self.resource()?);
        }
    }
}
